//! Crew 定义文件（TOML）
//!
//! ```toml
//! [crew]
//! name = "research"
//! process = "sequential"        # 或 hierarchical
//! max_redelegations = 1         # 可选，仅层级流程使用
//!
//! [manager]                     # 仅层级流程
//! id = "..."
//! role = "..."
//! goal = "..."
//!
//! [[agents]]
//! id = "researcher"
//! role = "..."
//! goal = "..."
//! tools = ["web_search"]
//!
//! [[tasks]]
//! id = "propose"
//! agent = "researcher"
//! description = "..."
//! expected_output = "..."
//! ```
//!
//! 所有表都拒绝未知字段；模板中的 `{name}` 占位符在 kickoff 时插值。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::agent::{Agent, AgentConfig, AgentId, AgentRunner};
use crate::core::{Crew, CrewError, DelegationPolicy, Process, Task, TaskConfig};
use crate::tools::{ToolRegistry, DEFAULT_TOOL_TIMEOUT_SECS};

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Failed to read crew definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid crew definition: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Crew(#[from] CrewError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrewMeta {
    pub name: String,
    #[serde(default)]
    pub process: Process,
    #[serde(default)]
    pub max_redelegations: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentDefinition {
    pub id: AgentId,
    pub role: String,
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub max_retry_limit: u32,
    #[serde(default)]
    pub verbose: bool,
}

impl AgentDefinition {
    fn into_parts(self) -> (AgentId, AgentConfig) {
        let config = AgentConfig {
            role: self.role,
            goal: self.goal,
            backstory: self.backstory,
            tools: self.tools,
            max_retry_limit: self.max_retry_limit,
            verbose: self.verbose,
        };
        (self.id, config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinition {
    pub id: String,
    pub description: String,
    pub expected_output: String,
    #[serde(default)]
    pub agent: Option<AgentId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrewDefinition {
    pub crew: CrewMeta,
    #[serde(default)]
    pub manager: Option<AgentDefinition>,
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

/// 组装 Crew 时的运行参数（来自 AppConfig）
#[derive(Debug, Clone)]
pub struct CrewSettings {
    pub tool_timeout: Duration,
    /// 定义文件未指定 max_redelegations 时使用
    pub max_redelegations: u32,
}

impl Default for CrewSettings {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            max_redelegations: 0,
        }
    }
}

impl CrewDefinition {
    pub fn from_toml_str(s: &str) -> Result<Self, DefinitionError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn process(&self) -> Process {
        self.crew.process
    }

    /// 全部模板（Agent 与任务）中出现的占位符名，去重后按首次出现排序
    pub fn placeholders(&self) -> Vec<String> {
        let agent_texts = self
            .manager
            .iter()
            .chain(self.agents.iter())
            .flat_map(|a| [a.role.as_str(), a.goal.as_str(), a.backstory.as_str()]);
        let task_texts = self
            .tasks
            .iter()
            .flat_map(|t| [t.description.as_str(), t.expected_output.as_str()]);

        let mut names: Vec<String> = Vec::new();
        for text in agent_texts.chain(task_texts) {
            for name in crate::core::placeholders(text) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// 构建 Crew；所有 Agent（含 Manager）共用同一个 runner 与工具注册表
    pub fn into_crew(
        self,
        registry: Arc<ToolRegistry>,
        runner: Arc<dyn AgentRunner>,
        policy: Option<Arc<dyn DelegationPolicy>>,
        settings: &CrewSettings,
    ) -> Result<Crew, DefinitionError> {
        let make_agent = |def: AgentDefinition| -> Result<Agent, CrewError> {
            let (id, config) = def.into_parts();
            Ok(Agent::new(id, config, runner.clone(), registry.clone())?
                .with_tool_timeout(settings.tool_timeout))
        };

        let mut builder = Crew::builder(self.crew.name)
            .process(self.crew.process)
            .max_redelegations(
                self.crew
                    .max_redelegations
                    .unwrap_or(settings.max_redelegations),
            );
        for def in self.agents {
            builder = builder.agent(make_agent(def)?);
        }
        for def in self.tasks {
            builder = builder.task(Task::new(
                def.id,
                TaskConfig {
                    description: def.description,
                    expected_output: def.expected_output,
                    agent: def.agent,
                },
            ));
        }
        if let Some(def) = self.manager {
            builder = builder.manager(make_agent(def)?);
        }
        if let Some(policy) = policy {
            builder = builder.delegation_policy(policy);
        }
        Ok(builder.build()?)
    }
}

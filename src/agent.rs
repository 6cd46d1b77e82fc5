//! Agent：角色、目标、背景与一组固定的工具绑定
//!
//! Agent 自身不做推理：execute(task, context) 把任务交给 AgentRunner（外部推理能力，
//! 如 LlmAgentRunner），Runner 只能通过该 Agent 的 ToolInvoker 调用工具。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::interpolate::{interpolate, Inputs};
use crate::core::{AgentError, CrewError, ExecutionContext, InterpolationError, Task};
use crate::tools::{ToolInvoker, ToolRegistry, DEFAULT_TOOL_TIMEOUT_SECS};

pub type AgentId = String;

/// Agent 配置记录（字段集合封闭）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
    /// 绑定的工具名（有序）
    #[serde(default)]
    pub tools: Vec<String>,
    /// 瞬时故障的额外重试次数，0 表示不重试
    #[serde(default)]
    pub max_retry_limit: u32,
    #[serde(default)]
    pub verbose: bool,
}

impl AgentConfig {
    pub fn new(role: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: String::new(),
            tools: Vec::new(),
            max_retry_limit: 0,
            verbose: false,
        }
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_retry_limit(mut self, limit: u32) -> Self {
        self.max_retry_limit = limit;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// 一次任务执行交给 Runner 的全部只读输入
pub struct AgentTurn<'a> {
    pub agent_id: &'a str,
    pub agent: &'a AgentConfig,
    pub task: &'a Task,
    pub context: &'a ExecutionContext,
    pub tools: &'a ToolInvoker,
}

/// 外部推理能力：把 (角色、目标、任务、上下文) 变成一段最终文本，期间可经 ToolInvoker 调用工具
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, turn: AgentTurn<'_>) -> Result<String, AgentError>;
}

/// 可执行单元；构造后不可变，由所属 Crew 独占
#[derive(Clone)]
pub struct Agent {
    id: AgentId,
    config: AgentConfig,
    runner: Arc<dyn AgentRunner>,
    tools: ToolInvoker,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// 创建 Agent；绑定的工具必须都已在 registry 中注册
    pub fn new(
        id: impl Into<AgentId>,
        config: AgentConfig,
        runner: Arc<dyn AgentRunner>,
        registry: Arc<ToolRegistry>,
    ) -> Result<Self, CrewError> {
        let id = id.into();
        if let Some(unknown) = config.tools.iter().find(|t| !registry.contains(t)) {
            return Err(CrewError::UnknownTool {
                agent: id,
                tool: unknown.clone(),
            });
        }
        let tools = ToolInvoker::new(
            registry,
            config.tools.clone(),
            config.max_retry_limit,
            Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        );
        Ok(Self {
            id,
            config,
            runner,
            tools,
        })
    }

    /// 覆盖单次工具调用超时（默认 10 秒）
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tools = self.tools.with_timeout(timeout);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn role(&self) -> &str {
        &self.config.role
    }

    pub fn tools(&self) -> &ToolInvoker {
        &self.tools
    }

    pub fn has_tools(&self) -> bool {
        !self.config.tools.is_empty()
    }

    pub(crate) fn interpolate(&self, inputs: &Inputs) -> Result<Agent, InterpolationError> {
        let field = |name: &str| format!("agent '{}' {}", self.id, name);
        let config = AgentConfig {
            role: interpolate(&self.config.role, inputs, &field("role"))?,
            goal: interpolate(&self.config.goal, inputs, &field("goal"))?,
            backstory: interpolate(&self.config.backstory, inputs, &field("backstory"))?,
            ..self.config.clone()
        };
        Ok(Agent {
            config,
            ..self.clone()
        })
    }

    /// 执行一个任务：上下文只读，返回唯一的最终文本或终止性错误
    pub async fn execute(&self, task: &Task, context: &ExecutionContext) -> Result<String, AgentError> {
        let start = Instant::now();
        if self.config.verbose {
            tracing::info!(agent = %self.id, role = %self.config.role, task = %task.id, context_entries = context.len(), "agent started task");
        } else {
            tracing::debug!(agent = %self.id, task = %task.id, "agent started task");
        }

        let result = self
            .runner
            .run(AgentTurn {
                agent_id: &self.id,
                agent: &self.config,
                task,
                context,
                tools: &self.tools,
            })
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(output) if self.config.verbose => {
                tracing::info!(agent = %self.id, task = %task.id, duration_ms, output_chars = output.chars().count(), "agent finished task");
            }
            Ok(_) => tracing::debug!(agent = %self.id, task = %task.id, duration_ms, "agent finished task"),
            Err(e) => tracing::warn!(agent = %self.id, task = %task.id, duration_ms, error = %e, "agent failed task"),
        }
        result
    }
}

//! 任务定义：指令模板、期望输出模板、可选的静态指派 Agent

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::core::interpolate::{interpolate, Inputs};
use crate::core::InterpolationError;

pub type TaskId = String;

/// 任务配置记录（字段集合封闭，未知字段在解析时报错）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub description: String,
    pub expected_output: String,
    /// 顺序流程中必填；层级流程中仅作为给 Manager 的提示
    #[serde(default)]
    pub agent: Option<AgentId>,
}

/// 计划中的一个任务；插值后不可变，每次 kickoff 恰好执行一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub expected_output: String,
    pub agent: Option<AgentId>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, config: TaskConfig) -> Self {
        Self {
            id: id.into(),
            description: config.description,
            expected_output: config.expected_output,
            agent: config.agent,
        }
    }

    /// 便捷构造：顺序流程中直接指定执行 Agent
    pub fn assigned(
        id: impl Into<TaskId>,
        agent: impl Into<AgentId>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: Some(agent.into()),
        }
    }

    pub(crate) fn interpolate(&self, inputs: &Inputs) -> Result<Task, InterpolationError> {
        Ok(Task {
            id: self.id.clone(),
            description: interpolate(
                &self.description,
                inputs,
                &format!("task '{}' description", self.id),
            )?,
            expected_output: interpolate(
                &self.expected_output,
                inputs,
                &format!("task '{}' expected_output", self.id),
            )?,
            agent: self.agent.clone(),
        })
    }

    /// Manager 重新委派时附加修订指令，返回新的任务副本
    pub fn with_instructions(&self, instructions: &str) -> Task {
        let mut revised = self.clone();
        if !instructions.trim().is_empty() {
            revised.description = format!(
                "{}\n\nAdditional instructions from the manager:\n{}",
                self.description,
                instructions.trim()
            );
        }
        revised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_config_rejects_unknown_fields() {
        let parsed: Result<TaskConfig, _> = toml::from_str(
            r#"
description = "d"
expected_output = "e"
async_execution = true
"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_interpolate_task() {
        let task = Task::assigned("propose", "researcher", "テーマ: {theme}", "{purpose} 向け");
        let inputs: Inputs = [("theme", "物語"), ("purpose", "調査")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let out = task.interpolate(&inputs).unwrap();
        assert_eq!(out.description, "テーマ: 物語");
        assert_eq!(out.expected_output, "調査 向け");
        assert_eq!(out.agent.as_deref(), Some("researcher"));
    }

    #[test]
    fn test_with_instructions_appends() {
        let task = Task::assigned("t", "a", "do it", "done");
        let revised = task.with_instructions("use another source");
        assert!(revised.description.starts_with("do it"));
        assert!(revised.description.ends_with("use another source"));
        assert_eq!(task.with_instructions("  ").description, "do it");
    }
}

//! 执行上下文：已完成任务输出的只追加日志
//!
//! 每个任务完成后追加一条 (task, agent, output)，之后不再修改或重排；后续任务只读可见。

use serde::Serialize;

use crate::agent::AgentId;
use crate::core::task::TaskId;

/// 单个任务的完成输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutput {
    pub task: TaskId,
    pub agent: AgentId,
    pub raw: String,
}

/// 只追加的执行上下文
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionContext {
    entries: Vec<TaskOutput>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条完成记录；仅由流程策略在任务完成时调用
    pub(crate) fn record(&mut self, output: TaskOutput) {
        self.entries.push(output);
    }

    pub fn entries(&self) -> &[TaskOutput] {
        &self.entries
    }

    /// 按完成顺序返回各任务输出文本
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.raw.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TaskOutput> {
        self.entries.last()
    }

    pub fn get(&self, task: &str) -> Option<&TaskOutput> {
        self.entries.iter().find(|e| e.task == task)
    }

    pub fn contains(&self, task: &str) -> bool {
        self.get(task).is_some()
    }

    /// 渲染为提示词片段：按顺序拼接各任务输出
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("### {} ({})\n{}", e.task, e.agent, e.raw))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn into_entries(self) -> Vec<TaskOutput> {
        self.entries
    }
}

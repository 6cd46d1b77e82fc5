//! 层级流程的委派决策接口
//!
//! Manager 每一步只给出一个 (任务, Worker) 对，或宣告结束；编排器只消费这个接口，自身不含任何分派启发式。
//! LLM 驱动的实现见 react::manager::LlmDelegation；这里提供确定性的 OrderedDelegation。

use std::collections::HashMap;

use async_trait::async_trait;

use crate::agent::{Agent, AgentId};
use crate::core::{DelegationError, ExecutionContext, Task, TaskId};

/// Manager 的一次决策
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delegation {
    /// 把待办任务交给某个 Worker；instructions 为可选的修订指令（重新委派时常用）
    Assign {
        task: TaskId,
        worker: AgentId,
        instructions: Option<String>,
    },
    /// 没有剩余任务
    Finished,
}

impl Delegation {
    pub fn assign(task: impl Into<TaskId>, worker: impl Into<AgentId>) -> Self {
        Delegation::Assign {
            task: task.into(),
            worker: worker.into(),
            instructions: None,
        }
    }
}

/// 上一次委派失败的记录，供 Manager 决定是否换人或改写指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelegation {
    pub task: TaskId,
    pub worker: AgentId,
    pub error: String,
    /// 该任务累计失败次数（从 1 开始）
    pub attempt: u32,
}

/// 交给 DelegationPolicy 的只读视图
pub struct DelegationRequest<'a> {
    pub manager: &'a Agent,
    /// 按声明顺序排列的待办任务
    pub remaining: &'a [Task],
    /// 候选 Worker（不含 Manager）
    pub workers: &'a [Agent],
    pub context: &'a ExecutionContext,
    pub last_failure: Option<&'a FailedDelegation>,
}

#[async_trait]
pub trait DelegationPolicy: Send + Sync {
    /// 选择下一个 (任务, Worker)
    async fn choose_next(&self, request: DelegationRequest<'_>) -> Result<Delegation, DelegationError>;

    /// 全部任务完成后由 Manager 产出汇总；None 表示直接使用最后一条上下文
    async fn summarize(
        &self,
        _manager: &Agent,
        _context: &ExecutionContext,
    ) -> Result<Option<String>, DelegationError> {
        Ok(None)
    }
}

/// 确定性策略：按声明顺序推进任务
///
/// Worker 选择优先级：显式路由表 > 任务上的 agent 提示 > 第一个 Worker。
/// 重新委派时把上次的失败原因作为修订指令附上。
#[derive(Debug, Clone, Default)]
pub struct OrderedDelegation {
    routes: HashMap<TaskId, AgentId>,
}

impl OrderedDelegation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, task: impl Into<TaskId>, worker: impl Into<AgentId>) -> Self {
        self.routes.insert(task.into(), worker.into());
        self
    }

    fn pick_worker<'a>(&self, task: &Task, workers: &'a [Agent]) -> Option<&'a Agent> {
        let by_id = |id: &str| workers.iter().find(|w| w.id() == id);
        self.routes
            .get(&task.id)
            .and_then(|id| by_id(id.as_str()))
            .or_else(|| task.agent.as_deref().and_then(by_id))
            .or_else(|| workers.first())
    }
}

#[async_trait]
impl DelegationPolicy for OrderedDelegation {
    async fn choose_next(&self, request: DelegationRequest<'_>) -> Result<Delegation, DelegationError> {
        let Some(task) = request.remaining.first() else {
            return Ok(Delegation::Finished);
        };
        let worker = self
            .pick_worker(task, request.workers)
            .ok_or_else(|| DelegationError::Policy("no worker available".to_string()))?;

        let instructions = request
            .last_failure
            .filter(|f| f.task == task.id)
            .map(|f| format!("前回の試行は失敗しました（{}）。別の方法で再度取り組んでください。", f.error));

        Ok(Delegation::Assign {
            task: task.id.clone(),
            worker: worker.id().to_string(),
            instructions,
        })
    }
}

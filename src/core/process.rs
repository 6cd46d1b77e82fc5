//! 流程策略：顺序 / 层级
//!
//! 两种策略都是单流：同一时刻只有一个任务在执行，ExecutionContext 只在任务成功后追加一条。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::core::delegation::{Delegation, DelegationPolicy, DelegationRequest, FailedDelegation};
use crate::core::{
    CrewError, DelegationError, ExecutionContext, OrchestrationError, Task, TaskId, TaskOutput,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    #[default]
    Sequential,
    Hierarchical,
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
            Process::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

/// 顺序流程：按声明顺序逐个执行，任一任务失败立即中止
pub(crate) async fn run_sequential(
    agents: &[Agent],
    tasks: &[Task],
    context: &mut ExecutionContext,
) -> Result<(), OrchestrationError> {
    for (idx, task) in tasks.iter().enumerate() {
        let agent_id = task
            .agent
            .as_deref()
            .ok_or_else(|| CrewError::UnassignedTask(task.id.clone()))?;
        let agent = agents
            .iter()
            .find(|a| a.id() == agent_id)
            .ok_or_else(|| CrewError::UnknownAgent {
                task: task.id.clone(),
                agent: agent_id.to_string(),
            })?;

        tracing::info!(step = idx + 1, total = tasks.len(), task = %task.id, agent = %agent_id, "running task");
        let raw = agent
            .execute(task, context)
            .await
            .map_err(|source| OrchestrationError::TaskFailed {
                task: task.id.clone(),
                agent: agent_id.to_string(),
                source,
            })?;
        context.record(TaskOutput {
            task: task.id.clone(),
            agent: agent_id.to_string(),
            raw,
        });
    }
    Ok(())
}

/// 层级流程：每一步向 policy 请求一个 (任务, Worker)，校验后执行
///
/// - Manager、未知 Worker、非待办任务都是非法决策，直接失败
/// - 仍有待办时返回 Finished 视为 PrematureFinish
/// - Worker 失败按任务计数，超过 max_redelegations 则整体失败，否则带着失败信息再问 policy
///
/// 返回 policy 的汇总（若有）
pub(crate) async fn run_hierarchical(
    manager: &Agent,
    workers: &[Agent],
    tasks: &[Task],
    policy: &dyn DelegationPolicy,
    max_redelegations: u32,
    context: &mut ExecutionContext,
) -> Result<Option<String>, OrchestrationError> {
    let mut remaining: Vec<Task> = tasks.to_vec();
    let mut failures: HashMap<TaskId, u32> = HashMap::new();
    let mut last_failure: Option<FailedDelegation> = None;

    while !remaining.is_empty() {
        let decision = policy
            .choose_next(DelegationRequest {
                manager,
                remaining: &remaining,
                workers,
                context,
                last_failure: last_failure.as_ref(),
            })
            .await?;

        let (task_id, worker_id, instructions) = match decision {
            Delegation::Finished => {
                return Err(DelegationError::PrematureFinish(remaining.len()).into())
            }
            Delegation::Assign {
                task,
                worker,
                instructions,
            } => (task, worker, instructions),
        };

        if worker_id == manager.id() {
            return Err(DelegationError::InvalidDecision(format!(
                "manager '{}' cannot execute task '{}'",
                worker_id, task_id
            ))
            .into());
        }
        let worker = workers
            .iter()
            .find(|w| w.id() == worker_id)
            .ok_or_else(|| DelegationError::InvalidDecision(format!("unknown worker '{worker_id}'")))?;
        let idx = remaining
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| DelegationError::InvalidDecision(format!("task '{task_id}' is not pending")))?;

        let task = match instructions.as_deref() {
            Some(extra) => remaining[idx].with_instructions(extra),
            None => remaining[idx].clone(),
        };
        tracing::info!(manager = %manager.id(), task = %task_id, worker = %worker_id, remaining = remaining.len(), "delegating task");

        match worker.execute(&task, context).await {
            Ok(raw) => {
                remaining.remove(idx);
                context.record(TaskOutput {
                    task: task_id,
                    agent: worker_id,
                    raw,
                });
                last_failure = None;
            }
            Err(source) => {
                let attempt = failures.entry(task_id.clone()).or_insert(0);
                *attempt += 1;
                if *attempt > max_redelegations {
                    return Err(OrchestrationError::TaskFailed {
                        task: task_id,
                        agent: worker_id,
                        source,
                    });
                }
                tracing::warn!(task = %task_id, worker = %worker_id, attempt = *attempt, max_redelegations, error = %source, "delegation failed, asking manager again");
                last_failure = Some(FailedDelegation {
                    task: task_id,
                    worker: worker_id,
                    error: source.to_string(),
                    attempt: *attempt,
                });
            }
        }
    }

    Ok(policy.summarize(manager, context).await?)
}

//! Crew：持有 Agent 集合、任务列表、流程策略，提供 kickoff
//!
//! kickoff 消费 Crew：先对全部 Agent / 任务模板插值（任一缺失立即失败，此时没有任何 Agent 执行），
//! 再创建新的 ExecutionContext，交给流程策略执行，最后返回最终文本与各任务输出。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::agent::Agent;
use crate::core::delegation::DelegationPolicy;
use crate::core::interpolate::Inputs;
use crate::core::process::{run_hierarchical, run_sequential, Process};
use crate::core::{CrewError, ExecutionContext, OrchestrationError, Task, TaskOutput};

/// kickoff 的结果
#[derive(Debug, Clone)]
pub struct CrewOutput {
    /// 最终文本：顺序流程为最后一个任务输出；层级流程为 Manager 汇总或最后一条输出
    pub raw: String,
    /// 按完成顺序排列的全部任务输出
    pub tasks_output: Vec<TaskOutput>,
}

enum Strategy {
    Sequential,
    Hierarchical {
        manager: Agent,
        policy: Arc<dyn DelegationPolicy>,
        max_redelegations: u32,
    },
}

pub struct Crew {
    name: String,
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    strategy: Strategy,
}

impl std::fmt::Debug for Crew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crew")
            .field("name", &self.name)
            .field("process", &self.process())
            .field("agents", &self.agents.iter().map(Agent::id).collect::<Vec<_>>())
            .field("tasks", &self.tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl Crew {
    pub fn builder(name: impl Into<String>) -> CrewBuilder {
        CrewBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process(&self) -> Process {
        match self.strategy {
            Strategy::Sequential => Process::Sequential,
            Strategy::Hierarchical { .. } => Process::Hierarchical,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn manager(&self) -> Option<&Agent> {
        match &self.strategy {
            Strategy::Hierarchical { manager, .. } => Some(manager),
            Strategy::Sequential => None,
        }
    }

    pub async fn kickoff(self, inputs: &Inputs) -> Result<CrewOutput, OrchestrationError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let process = self.process();
        tracing::info!(run_id = %run_id, crew = %self.name, process = %process, tasks = self.tasks.len(), "crew kickoff");
        let start = Instant::now();

        let agents = self
            .agents
            .iter()
            .map(|a| a.interpolate(inputs))
            .collect::<Result<Vec<_>, _>>()?;
        let tasks = self
            .tasks
            .iter()
            .map(|t| t.interpolate(inputs))
            .collect::<Result<Vec<_>, _>>()?;

        let mut context = ExecutionContext::new();
        let summary = match self.strategy {
            Strategy::Sequential => {
                run_sequential(&agents, &tasks, &mut context).await?;
                None
            }
            Strategy::Hierarchical {
                manager,
                policy,
                max_redelegations,
            } => {
                let manager = manager.interpolate(inputs)?;
                run_hierarchical(
                    &manager,
                    &agents,
                    &tasks,
                    policy.as_ref(),
                    max_redelegations,
                    &mut context,
                )
                .await?
            }
        };

        let raw = match summary {
            Some(text) => text,
            None => context
                .last()
                .map(|o| o.raw.clone())
                .ok_or(OrchestrationError::NoOutput)?,
        };
        tracing::info!(
            run_id = %run_id,
            crew = %self.name,
            completed = context.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "crew finished"
        );
        Ok(CrewOutput {
            raw,
            tasks_output: context.into_entries(),
        })
    }
}

/// Crew 构建器：显式注册 Agent 与任务，build 时做结构校验
pub struct CrewBuilder {
    name: String,
    process: Process,
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    manager: Option<Agent>,
    policy: Option<Arc<dyn DelegationPolicy>>,
    max_redelegations: u32,
}

impl CrewBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            process: Process::Sequential,
            agents: Vec::new(),
            tasks: Vec::new(),
            manager: None,
            policy: None,
            max_redelegations: 0,
        }
    }

    pub fn process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn manager(mut self, manager: Agent) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn delegation_policy(mut self, policy: Arc<dyn DelegationPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// 同一任务允许的重新委派次数（默认 0：Worker 失败即整体失败）
    pub fn max_redelegations(mut self, n: u32) -> Self {
        self.max_redelegations = n;
        self
    }

    pub fn build(self) -> Result<Crew, CrewError> {
        if self.tasks.is_empty() {
            return Err(CrewError::NoTasks);
        }
        if self.agents.is_empty() {
            return Err(CrewError::NoWorkers);
        }

        let mut agent_ids = HashSet::new();
        for agent in &self.agents {
            if !agent_ids.insert(agent.id()) {
                return Err(CrewError::DuplicateAgent(agent.id().to_string()));
            }
        }
        let mut task_ids = HashSet::new();
        for task in &self.tasks {
            if !task_ids.insert(task.id.as_str()) {
                return Err(CrewError::DuplicateTask(task.id.clone()));
            }
            if let Some(agent) = &task.agent {
                if !agent_ids.contains(agent.as_str()) {
                    return Err(CrewError::UnknownAgent {
                        task: task.id.clone(),
                        agent: agent.clone(),
                    });
                }
            }
        }

        let strategy = match self.process {
            Process::Sequential => {
                if self.manager.is_some() {
                    return Err(CrewError::UnexpectedManager);
                }
                if let Some(task) = self.tasks.iter().find(|t| t.agent.is_none()) {
                    return Err(CrewError::UnassignedTask(task.id.clone()));
                }
                Strategy::Sequential
            }
            Process::Hierarchical => {
                let manager = self.manager.ok_or(CrewError::ManagerRequired)?;
                let policy = self.policy.ok_or(CrewError::PolicyRequired)?;
                if manager.has_tools() {
                    return Err(CrewError::ManagerHasTools(manager.id().to_string()));
                }
                if agent_ids.contains(manager.id()) {
                    return Err(CrewError::ManagerIsWorker(manager.id().to_string()));
                }
                Strategy::Hierarchical {
                    manager,
                    policy,
                    max_redelegations: self.max_redelegations,
                }
            }
        };

        Ok(Crew {
            name: self.name,
            agents: self.agents,
            tasks: self.tasks,
            strategy,
        })
    }
}

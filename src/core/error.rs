//! 编排各层错误类型
//!
//! 工具层只把「瞬时技术故障」作为错误抛出，其余失败一律以文本返回；
//! Agent 执行失败（重试耗尽、未绑定工具等）向上传播，在 Crew 边界统一包装为 OrchestrationError，保留原始 source。

use thiserror::Error;

/// Agent 执行一个任务时的不可恢复错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 瞬时故障重试次数耗尽
    #[error("Tool {tool} failed after {attempts} attempt(s): {reason}")]
    ToolRetriesExhausted {
        tool: String,
        attempts: u32,
        reason: String,
    },

    /// 调用了未绑定到该 Agent 的工具（结构性错误）
    #[error("Tool not bound to agent: {0}")]
    ToolNotBound(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Max steps exceeded ({0})")]
    MaxStepsExceeded(usize),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// 模板插值错误：占位符在输入中没有对应的值
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("Missing value for placeholder '{{{placeholder}}}' in {field}")]
    MissingPlaceholderValue { field: String, placeholder: String },
}

/// Crew 结构校验错误（构建期发现，任何 Agent 执行之前）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrewError {
    #[error("Crew has no tasks")]
    NoTasks,

    #[error("Crew has no worker agents")]
    NoWorkers,

    #[error("Duplicate agent id: {0}")]
    DuplicateAgent(String),

    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("Task '{task}' references unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },

    #[error("Task '{0}' has no assigned agent (required by the sequential process)")]
    UnassignedTask(String),

    #[error("Agent '{agent}' binds unknown tool '{tool}'")]
    UnknownTool { agent: String, tool: String },

    #[error("Hierarchical process requires a manager agent")]
    ManagerRequired,

    #[error("Hierarchical process requires a delegation policy")]
    PolicyRequired,

    #[error("Sequential process does not take a manager agent")]
    UnexpectedManager,

    #[error("Manager agent '{0}' must not hold tool bindings")]
    ManagerHasTools(String),

    #[error("Manager agent '{0}' must not be registered as a worker")]
    ManagerIsWorker(String),
}

/// 层级流程中 Manager 决策相关的错误
#[derive(Error, Debug)]
pub enum DelegationError {
    #[error("Manager decision failed: {0}")]
    Policy(String),

    #[error("Invalid delegation: {0}")]
    InvalidDecision(String),

    #[error("Manager finished with {0} task(s) still pending")]
    PrematureFinish(usize),
}

/// Crew 边界的统一失败类型
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Input interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Task '{task}' failed on agent '{agent}'")]
    TaskFailed {
        task: String,
        agent: String,
        #[source]
        source: AgentError,
    },

    #[error("Delegation failed: {0}")]
    Delegation(#[from] DelegationError),

    #[error("Invalid crew: {0}")]
    Crew(#[from] CrewError),

    #[error("Crew produced no output")]
    NoOutput,
}

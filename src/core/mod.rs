//! 核心编排层：错误类型、模板插值、执行上下文、任务、流程策略与 Crew

pub mod context;
pub mod crew;
pub mod delegation;
pub mod error;
pub mod interpolate;
pub mod process;
pub mod task;

pub use context::{ExecutionContext, TaskOutput};
pub use crew::{Crew, CrewBuilder, CrewOutput};
pub use delegation::{
    Delegation, DelegationPolicy, DelegationRequest, FailedDelegation, OrderedDelegation,
};
pub use error::{
    AgentError, CrewError, DelegationError, InterpolationError, OrchestrationError,
};
pub use interpolate::{interpolate, placeholders, Inputs};
pub use process::Process;
pub use task::{Task, TaskConfig, TaskId};

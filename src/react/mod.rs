//! ReAct 层：LLM 驱动的 AgentRunner 与层级流程 Manager

pub mod loop_;
pub mod manager;
pub mod planner;

pub use loop_::{LlmAgentRunner, MAX_REACT_STEPS};
pub use manager::{parse_decision, LlmDelegation};
pub use planner::{parse_llm_output, PlannerOutput, ToolCall};

//! crewkit - 多智能体编排引擎
//!
//! 模块划分：
//! - **agent**: Agent 配置、AgentRunner 抽象与任务执行
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 插值、执行上下文、任务、顺序 / 层级流程与 Crew
//! - **crews**: crew 定义文件与内置 research / weekend crew
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **react**: LLM 驱动的 ReAct Runner 与 Manager
//! - **tools**: 工具注册、调用器（超时 + 重试 + 审计）与天气 / 路线 / 搜索工具

pub mod agent;
pub mod config;
pub mod core;
pub mod crews;
pub mod llm;
pub mod observability;
pub mod react;
pub mod tools;

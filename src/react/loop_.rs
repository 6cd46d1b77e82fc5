//! ReAct 主循环：LLM 驱动的 AgentRunner
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到 LLM 给出最终回答或达到最大步数。
//! 工具一律经由 Agent 的 ToolInvoker 调用；未绑定工具与重试耗尽直接作为 AgentError 上抛。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentRunner, AgentTurn};
use crate::core::AgentError;
use crate::llm::{LlmClient, Message};
use crate::react::planner::{
    build_system_prompt, build_task_prompt, format_correction, parse_llm_output, PlannerOutput,
};

/// 单个任务内最大 ReAct 步数，防止死循环
pub const MAX_REACT_STEPS: usize = 20;
/// Observation 日志预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

pub struct LlmAgentRunner {
    llm: Arc<dyn LlmClient>,
    max_steps: usize,
}

impl LlmAgentRunner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            max_steps: MAX_REACT_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(OBSERVATION_PREVIEW_CHARS).collect();
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}

#[async_trait]
impl AgentRunner for LlmAgentRunner {
    async fn run(&self, turn: AgentTurn<'_>) -> Result<String, AgentError> {
        let mut messages = vec![
            Message::system(build_system_prompt(&turn)),
            Message::user(build_task_prompt(&turn)),
        ];

        for step in 0..self.max_steps {
            let output = self
                .llm
                .complete(&messages)
                .await
                .map_err(|e| AgentError::LlmError(e.to_string()))?;

            match parse_llm_output(&output) {
                Ok(PlannerOutput::Response(answer)) => {
                    tracing::debug!(agent = %turn.agent_id, task = %turn.task.id, step, "final answer");
                    return Ok(answer);
                }
                Ok(PlannerOutput::ToolCall(call)) => {
                    tracing::debug!(agent = %turn.agent_id, step, tool = %call.tool, "tool call");
                    let observation = turn.tools.invoke(&call.tool, call.args).await?;
                    tracing::debug!(agent = %turn.agent_id, tool = %call.tool, observation = %preview(&observation), "observation");
                    messages.push(Message::assistant(output));
                    messages.push(Message::user(format!(
                        "Observation from {}:\n{}",
                        call.tool, observation
                    )));
                }
                Err(e) => {
                    tracing::warn!(agent = %turn.agent_id, step, error = %e, "unparseable tool call, asking for correction");
                    messages.push(Message::assistant(output));
                    messages.push(Message::user(format_correction(&e)));
                }
            }
        }

        Err(AgentError::MaxStepsExceeded(self.max_steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::Value;

    use crate::agent::AgentConfig;
    use crate::core::{ExecutionContext, Task, TaskOutput};
    use crate::llm::{Role, ScriptedLlmClient};
    use crate::tools::{Tool, ToolError, ToolInvoker, ToolRegistry};

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "uppercases text"
        }

        async fn execute(&self, args: Value) -> Result<String, ToolError> {
            Ok(args["text"].as_str().unwrap_or_default().to_uppercase())
        }
    }

    fn invoker(bound: &[&str]) -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry.register(Upper);
        ToolInvoker::new(
            Arc::new(registry),
            bound.iter().map(|s| s.to_string()).collect(),
            0,
            Duration::from_secs(1),
        )
    }

    async fn run(llm: Arc<ScriptedLlmClient>, bound: &[&str], max_steps: usize) -> Result<String, AgentError> {
        let config = AgentConfig::new("校正者", "文章を整える");
        let task = Task::assigned("t", "a", "整形して", "大文字の文章");
        let mut context = ExecutionContext::new();
        context.record(TaskOutput {
            task: "prev".into(),
            agent: "b".into(),
            raw: "前の成果".into(),
        });
        let tools = invoker(bound);
        LlmAgentRunner::new(llm)
            .with_max_steps(max_steps)
            .run(AgentTurn {
                agent_id: "a",
                agent: &config,
                task: &task,
                context: &context,
                tools: &tools,
            })
            .await
    }

    #[tokio::test]
    async fn test_tool_then_final_answer() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "upper", "args": {"text": "hello"}}"#,
            "完成: HELLO",
        ]));
        let out = run(llm.clone(), &["upper"], 5).await.unwrap();
        assert_eq!(out, "完成: HELLO");

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0][0].role, Role::System);
        assert!(requests[0][0].content.contains("校正者"));
        assert!(requests[0][1].content.contains("前の成果"));
        let last = requests[1].last().unwrap();
        assert_eq!(last.content, "Observation from upper:\nHELLO");
    }

    #[tokio::test]
    async fn test_unbound_tool_fails_task() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"tool": "upper", "args": {}}"#]));
        let err = run(llm, &[], 5).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotBound(name) if name == "upper"));
    }

    #[tokio::test]
    async fn test_max_steps_exceeded() {
        let call = r#"{"tool": "upper", "args": {"text": "x"}}"#;
        let llm = Arc::new(ScriptedLlmClient::new([call, call, call]));
        let err = run(llm, &["upper"], 2).await.unwrap_err();
        assert!(matches!(err, AgentError::MaxStepsExceeded(2)));
    }

    #[tokio::test]
    async fn test_malformed_call_gets_correction() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "upper", "args": {"text": }"#,
            "わかりました。最終回答です。",
        ]));
        let out = run(llm.clone(), &["upper"], 5).await.unwrap();
        assert_eq!(out, "わかりました。最終回答です。");
        assert!(llm.requests()[1].last().unwrap().content.contains("解析できませんでした"));
    }
}

//! LLM 驱动的 Manager：层级流程中的委派决策与最终汇总
//!
//! 每一步把待办任务、候选 Worker、已完成成果交给 LLM，要求只输出一个 JSON 决策：
//! {"task": "...", "worker": "...", "instructions": "..."} 或 {"finished": true}。
//! 决策合法性由编排器校验，这里只负责解析。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::agent::Agent;
use crate::core::{
    Delegation, DelegationError, DelegationPolicy, DelegationRequest, ExecutionContext,
};
use crate::llm::{LlmClient, Message};
use crate::react::planner::extract_json;

/// 解析失败时最多重新询问的次数
const MAX_DECISION_ATTEMPTS: usize = 2;

#[derive(Debug, Deserialize)]
struct DecisionJson {
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    worker: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    finished: bool,
}

/// 从 LLM 输出解析委派决策
pub fn parse_decision(output: &str) -> Result<Delegation, DelegationError> {
    let json = extract_json(output.trim())
        .ok_or_else(|| DelegationError::Policy(format!("no JSON decision in: {}", output.trim())))?;
    let decision: DecisionJson = serde_json::from_str(json)
        .map_err(|e| DelegationError::Policy(format!("{}: {}", e, json)))?;

    if decision.finished {
        return Ok(Delegation::Finished);
    }
    match (decision.task, decision.worker) {
        (Some(task), Some(worker)) if !task.trim().is_empty() && !worker.trim().is_empty() => {
            Ok(Delegation::Assign {
                task: task.trim().to_string(),
                worker: worker.trim().to_string(),
                instructions: decision.instructions.filter(|i| !i.trim().is_empty()),
            })
        }
        _ => Err(DelegationError::Policy(format!(
            "decision must name both task and worker: {}",
            json
        ))),
    }
}

fn manager_system_prompt(manager: &Agent) -> String {
    let cfg = manager.config();
    let mut prompt = format!(
        "あなたは「{}」です。チームのマネージャーとして、自分ではタスクを実行せず、\
         各タスクを最適なメンバーに割り当てます。\n\n## 目標\n{}\n",
        cfg.role.trim(),
        cfg.goal.trim()
    );
    if !cfg.backstory.trim().is_empty() {
        prompt += &format!("\n## 背景\n{}\n", cfg.backstory.trim());
    }
    prompt
}

fn decision_prompt(request: &DelegationRequest<'_>) -> String {
    let mut prompt = String::from("## 未完了のタスク（宣言順）\n");
    for task in request.remaining {
        prompt += &format!("- id: {}\n  内容: {}\n", task.id, task.description.trim());
        if let Some(hint) = &task.agent {
            prompt += &format!("  推奨担当: {}\n", hint);
        }
    }

    prompt += "\n## メンバー\n";
    for worker in request.workers {
        let tools = worker.tools().bound_tools();
        prompt += &format!(
            "- id: {}\n  役割: {}\n  ツール: {}\n",
            worker.id(),
            worker.role().trim(),
            if tools.is_empty() { "なし".to_string() } else { tools.join(", ") }
        );
    }

    if !request.context.is_empty() {
        prompt += &format!("\n## 完了済みの成果\n{}\n", request.context.render());
    }
    if let Some(failure) = request.last_failure {
        prompt += &format!(
            "\n## 直前の割り当ての失敗\nタスク {} を {} に割り当てましたが失敗しました（{}回目）: {}\n\
             別のメンバーに割り当てるか、instructions で指示を修正してください。\n",
            failure.task, failure.worker, failure.attempt, failure.error
        );
    }

    prompt += "\n次に進めるタスクを1つ選び、担当メンバーを決めてください。\
               次の形式の JSON のみを出力してください:\n\
               {\"task\": \"<タスクid>\", \"worker\": \"<メンバーid>\", \"instructions\": \"<任意の追加指示>\"}\n\
               すべてのタスクが完了している場合のみ {\"finished\": true} を出力してください。";
    prompt
}

pub struct LlmDelegation {
    llm: Arc<dyn LlmClient>,
}

impl LlmDelegation {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl DelegationPolicy for LlmDelegation {
    async fn choose_next(&self, request: DelegationRequest<'_>) -> Result<Delegation, DelegationError> {
        let mut messages = vec![
            Message::system(manager_system_prompt(request.manager)),
            Message::user(decision_prompt(&request)),
        ];

        let mut last_error = DelegationError::Policy("no decision".to_string());
        for attempt in 1..=MAX_DECISION_ATTEMPTS {
            let output = self
                .llm
                .complete(&messages)
                .await
                .map_err(|e| DelegationError::Policy(e.to_string()))?;
            match parse_decision(&output) {
                Ok(decision) => {
                    tracing::debug!(manager = %request.manager.id(), ?decision, "manager decision");
                    return Ok(decision);
                }
                Err(e) => {
                    tracing::warn!(manager = %request.manager.id(), attempt, error = %e, "unparseable manager decision");
                    messages.push(Message::assistant(output));
                    messages.push(Message::user(
                        "決定を解析できませんでした。指定された形式の JSON のみを出力してください。",
                    ));
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn summarize(
        &self,
        manager: &Agent,
        context: &ExecutionContext,
    ) -> Result<Option<String>, DelegationError> {
        let messages = vec![
            Message::system(manager_system_prompt(manager)),
            Message::user(format!(
                "すべてのタスクが完了しました。以下の成果を統合し、依頼者に渡す最終成果物を作成してください。\n\n{}",
                context.render()
            )),
        ];
        let summary = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| DelegationError::Policy(e.to_string()))?;
        Ok(Some(summary.trim().to_string()).filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::agent::{AgentConfig, AgentRunner, AgentTurn};
    use crate::core::{AgentError, FailedDelegation, Task, TaskOutput};
    use crate::llm::{Role, ScriptedLlmClient};
    use crate::tools::ToolRegistry;

    struct Idle;

    #[async_trait]
    impl AgentRunner for Idle {
        async fn run(&self, _turn: AgentTurn<'_>) -> Result<String, AgentError> {
            Ok(String::new())
        }
    }

    fn agent(id: &str, role: &str) -> Agent {
        Agent::new(
            id,
            AgentConfig::new(role, "週末を楽しむ"),
            Arc::new(Idle),
            Arc::new(ToolRegistry::new()),
        )
        .unwrap()
    }

    struct Fixture {
        manager: Agent,
        workers: Vec<Agent>,
        tasks: Vec<Task>,
        context: ExecutionContext,
    }

    impl Fixture {
        fn new() -> Self {
            let mut context = ExecutionContext::new();
            context.record(TaskOutput {
                task: "fetch_weather".into(),
                agent: "weather_specialist".into(),
                raw: "晴れ、最高23℃".into(),
            });
            Self {
                manager: agent("planner", "週末プランナー"),
                workers: vec![agent("scout", "ローカルスカウト"), agent("curator", "キュレーター")],
                tasks: vec![Task::assigned("explore", "scout", "周辺の候補を探す", "候補リスト")],
                context,
            }
        }

        fn request<'a>(&'a self, last_failure: Option<&'a FailedDelegation>) -> DelegationRequest<'a> {
            DelegationRequest {
                manager: &self.manager,
                remaining: &self.tasks,
                workers: &self.workers,
                context: &self.context,
                last_failure,
            }
        }
    }

    #[test]
    fn test_parse_assign_and_finished() {
        assert_eq!(
            parse_decision("```json\n{\"task\": \"fetch_weather\", \"worker\": \"weather_specialist\"}\n```")
                .unwrap(),
            Delegation::assign("fetch_weather", "weather_specialist")
        );
        assert_eq!(
            parse_decision("{\"task\": \"a\", \"worker\": \"b\", \"instructions\": \"短く\"}").unwrap(),
            Delegation::Assign {
                task: "a".into(),
                worker: "b".into(),
                instructions: Some("短く".into())
            }
        );
        assert_eq!(parse_decision("{\"finished\": true}").unwrap(), Delegation::Finished);
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert!(parse_decision("担当者を決めました").is_err());
        assert!(parse_decision("{\"task\": \"a\"}").is_err());
    }

    #[tokio::test]
    async fn test_choose_next_reasks_after_unparseable_reply() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "scout に任せるのが良さそうです",
            r#"{"task": "explore", "worker": "scout", "instructions": "徒歩圏内で"}"#,
        ]));
        let fixture = Fixture::new();
        let decision = LlmDelegation::new(llm.clone())
            .choose_next(fixture.request(None))
            .await
            .unwrap();
        assert_eq!(
            decision,
            Delegation::Assign {
                task: "explore".into(),
                worker: "scout".into(),
                instructions: Some("徒歩圏内で".into())
            }
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0][0].content.contains("「週末プランナー」"));
        let prompt = &requests[0][1].content;
        assert!(prompt.contains("- id: explore"));
        assert!(prompt.contains("推奨担当: scout"));
        assert!(prompt.contains("役割: キュレーター"));
        assert!(prompt.contains("ツール: なし"));
        assert!(prompt.contains("晴れ、最高23℃"));
        assert!(!prompt.contains("直前の割り当ての失敗"));

        let retry = &requests[1];
        assert_eq!(retry.len(), 4);
        assert_eq!(retry[2].role, Role::Assistant);
        assert_eq!(retry[2].content, "scout に任せるのが良さそうです");
        assert!(retry[3].content.contains("解析できませんでした"));
    }

    #[tokio::test]
    async fn test_choose_next_gives_up_after_max_attempts() {
        let llm = Arc::new(ScriptedLlmClient::new(["考え中です", r#"{"task": "explore"}"#, "{\"finished\": true}"]));
        let fixture = Fixture::new();
        let err = LlmDelegation::new(llm.clone())
            .choose_next(fixture.request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Policy(msg) if msg.contains("task and worker")));
        assert_eq!(llm.requests().len(), MAX_DECISION_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_choose_next_reports_last_failure() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"task": "explore", "worker": "curator"}"#]));
        let fixture = Fixture::new();
        let failure = FailedDelegation {
            task: "explore".into(),
            worker: "scout".into(),
            error: "tool timed out".into(),
            attempt: 1,
        };
        let decision = LlmDelegation::new(llm.clone())
            .choose_next(fixture.request(Some(&failure)))
            .await
            .unwrap();
        assert_eq!(decision, Delegation::assign("explore", "curator"));

        let prompt = &llm.requests()[0][1].content;
        assert!(prompt.contains("直前の割り当ての失敗"));
        assert!(prompt.contains("タスク explore を scout に割り当てましたが失敗しました（1回目）: tool timed out"));
    }

    #[tokio::test]
    async fn test_llm_failure_is_policy_error() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        let fixture = Fixture::new();
        let err = LlmDelegation::new(llm)
            .choose_next(fixture.request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Policy(_)));
    }

    #[tokio::test]
    async fn test_summarize_trims_and_empty_is_none() {
        let fixture = Fixture::new();
        let llm = Arc::new(ScriptedLlmClient::new(["\n  土曜日のプラン: 美術館とカフェ  \n", "   "]));
        let policy = LlmDelegation::new(llm.clone());

        let summary = policy.summarize(&fixture.manager, &fixture.context).await.unwrap();
        assert_eq!(summary.as_deref(), Some("土曜日のプラン: 美術館とカフェ"));
        assert!(llm.requests()[0][1].content.contains("晴れ、最高23℃"));

        let summary = policy.summarize(&fixture.manager, &fixture.context).await.unwrap();
        assert_eq!(summary, None);
    }
}

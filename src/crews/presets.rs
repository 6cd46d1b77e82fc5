//! 内置 crew：research（顺序）与 weekend（层级）
//!
//! 定义文件随二进制内置；配置了 crew.definitions_dir 且其中存在同名 toml 时优先使用外部文件。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local};

use crate::config::AppConfig;
use crate::core::{CrewOutput, DelegationPolicy, Inputs, OrderedDelegation, Process};
use crate::crews::definition::{CrewDefinition, CrewSettings, DefinitionError};
use crate::llm::LlmClient;
use crate::react::{LlmAgentRunner, LlmDelegation};
use crate::tools::ToolRegistry;

const RESEARCH_TOML: &str = include_str!("../../config/crews/research.toml");
const WEEKEND_TOML: &str = include_str!("../../config/crews/weekend.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CrewKind {
    Research,
    Weekend,
}

impl CrewKind {
    pub fn name(&self) -> &'static str {
        match self {
            CrewKind::Research => "research",
            CrewKind::Weekend => "weekend",
        }
    }

    pub fn builtin_toml(&self) -> &'static str {
        match self {
            CrewKind::Research => RESEARCH_TOML,
            CrewKind::Weekend => WEEKEND_TOML,
        }
    }
}

/// 读取 crew 定义：`<dir>/<name>.toml` 存在则用之，否则用内置定义
pub fn load_definition(
    kind: CrewKind,
    definitions_dir: Option<&Path>,
) -> Result<CrewDefinition, DefinitionError> {
    if let Some(dir) = definitions_dir {
        let path = dir.join(format!("{}.toml", kind.name()));
        if path.exists() {
            tracing::info!(path = %path.display(), "loading crew definition");
            return CrewDefinition::load(&path);
        }
    }
    CrewDefinition::from_toml_str(kind.builtin_toml())
}

/// current_date は「2025年11月22日」形式
fn date_inputs(now: &DateTime<Local>) -> Inputs {
    let mut inputs = Inputs::new();
    inputs.insert("current_date".into(), now.format("%Y年%m月%d日").to_string());
    inputs
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    pub theme: String,
    pub purpose: String,
    pub client_background: String,
}

impl Default for ResearchRequest {
    fn default() -> Self {
        Self {
            theme: "人はなぜ物語を求めるのか？".to_string(),
            purpose: "生成AIを活用した新規サービス開発のための基礎調査".to_string(),
            client_background: "私はIT企業で新規事業開発を担当しており、生成AIを活用したサービスの企画を進めています。".to_string(),
        }
    }
}

pub fn research_inputs(request: &ResearchRequest, now: DateTime<Local>) -> Inputs {
    let mut inputs = date_inputs(&now);
    inputs.insert("current_year".into(), now.year().to_string());
    inputs.insert("current_month".into(), now.month().to_string());
    inputs.insert("theme".into(), request.theme.clone());
    inputs.insert("purpose".into(), request.purpose.clone());
    inputs.insert("client_background".into(), request.client_background.clone());
    inputs
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekendRequest {
    pub location: String,
    pub interests: String,
    pub budget: String,
    pub companions: String,
    pub weather: String,
}

impl Default for WeekendRequest {
    fn default() -> Self {
        Self {
            location: "東京23区".to_string(),
            interests: "カフェ巡りと美術館、夜はライブハウス".to_string(),
            budget: "1人あたり1.5万円以内".to_string(),
            companions: "友人2人".to_string(),
            weather: "晴れ時々曇り、最高23℃".to_string(),
        }
    }
}

pub fn weekend_inputs(request: &WeekendRequest, now: DateTime<Local>) -> Inputs {
    let mut inputs = date_inputs(&now);
    inputs.insert("location".into(), request.location.clone());
    inputs.insert("interests".into(), request.interests.clone());
    inputs.insert("budget".into(), request.budget.clone());
    inputs.insert("companions".into(), request.companions.clone());
    inputs.insert("weather".into(), request.weather.clone());
    inputs
}

/// 加载定义并以 LLM Runner 组装 Crew
///
/// 层级流程：有真实 LLM 时由 LlmDelegation 决策，否则退回按声明顺序的 OrderedDelegation。
pub fn build_crew(
    kind: CrewKind,
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    use_llm_manager: bool,
) -> Result<crate::core::Crew, DefinitionError> {
    let definition = load_definition(kind, cfg.crew.definitions_dir.as_deref())?;
    let runner = Arc::new(LlmAgentRunner::new(llm.clone()).with_max_steps(cfg.crew.max_react_steps));
    let policy: Option<Arc<dyn DelegationPolicy>> = match definition.process() {
        Process::Sequential => None,
        Process::Hierarchical if use_llm_manager => Some(Arc::new(LlmDelegation::new(llm))),
        Process::Hierarchical => {
            tracing::warn!("no LLM configured, manager falls back to declared task order");
            Some(Arc::new(OrderedDelegation::new()))
        }
    };
    let settings = CrewSettings {
        tool_timeout: Duration::from_secs(cfg.tools.tool_timeout_secs),
        max_redelegations: cfg.crew.max_redelegations,
    };
    definition.into_crew(registry, runner, policy, &settings)
}

/// 组装并执行一次 kickoff
pub async fn run_crew(
    kind: CrewKind,
    inputs: &Inputs,
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    use_llm_manager: bool,
) -> anyhow::Result<CrewOutput> {
    let crew = build_crew(kind, cfg, llm.clone(), registry, use_llm_manager)?;
    let output = crew.kickoff(inputs).await?;
    let (prompt_tokens, completion_tokens, total_tokens) = llm.token_usage();
    tracing::info!(
        crew = kind.name(),
        tasks = output.tasks_output.len(),
        prompt_tokens,
        completion_tokens,
        total_tokens,
        "crew finished"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 22, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_builtin_definitions_parse() {
        let research = load_definition(CrewKind::Research, None).unwrap();
        assert_eq!(research.process(), Process::Sequential);
        let ids: Vec<&str> = research.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["propose", "review", "finalize"]);

        let weekend = load_definition(CrewKind::Weekend, None).unwrap();
        assert_eq!(weekend.process(), Process::Hierarchical);
        assert_eq!(weekend.agents.len(), 7);
        assert_eq!(weekend.tasks.len(), 7);
        assert!(weekend.manager.as_ref().is_some_and(|m| m.tools.is_empty()));
    }

    #[test]
    fn test_inputs_cover_every_placeholder() {
        let research = load_definition(CrewKind::Research, None).unwrap();
        let inputs = research_inputs(&ResearchRequest::default(), fixed_now());
        for name in research.placeholders() {
            assert!(inputs.contains_key(&name), "research missing {name}");
        }
        assert_eq!(inputs["current_date"], "2025年11月22日");
        assert_eq!(inputs["current_month"], "11");

        let weekend = load_definition(CrewKind::Weekend, None).unwrap();
        let inputs = weekend_inputs(&WeekendRequest::default(), fixed_now());
        for name in weekend.placeholders() {
            assert!(inputs.contains_key(&name), "weekend missing {name}");
        }
        assert_eq!(inputs["location"], "東京23区");
        assert_eq!(inputs["current_date"], "2025年11月22日");
        assert!(!inputs.contains_key("current_year"));
        assert!(!inputs.contains_key("current_month"));
        assert_eq!(inputs.len(), 6);
    }

    #[tokio::test]
    async fn test_run_crew_offline_with_mock_llm() {
        let cfg = AppConfig::default();
        let registry = Arc::new(crate::tools::default_registry(&cfg.tools));
        let llm: Arc<dyn LlmClient> = Arc::new(crate::llm::MockLlmClient);
        let inputs = research_inputs(&ResearchRequest::default(), fixed_now());

        let out = run_crew(CrewKind::Research, &inputs, &cfg, llm, registry, false)
            .await
            .unwrap();
        let tasks: Vec<&str> = out.tasks_output.iter().map(|o| o.task.as_str()).collect();
        assert_eq!(tasks, vec!["propose", "review", "finalize"]);
        assert!(out.raw.starts_with("Echo from Mock:"));
    }

    #[test]
    fn test_definitions_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("research.toml"),
            "[crew]\nname = \"custom\"\n\n[[agents]]\nid = \"a\"\nrole = \"r\"\ngoal = \"g\"\n\n[[tasks]]\nid = \"t\"\nagent = \"a\"\ndescription = \"d\"\nexpected_output = \"e\"\n",
        )
        .unwrap();
        let def = load_definition(CrewKind::Research, Some(dir.path())).unwrap();
        assert_eq!(def.crew.name, "custom");

        let def = load_definition(CrewKind::Weekend, Some(dir.path())).unwrap();
        assert_eq!(def.crew.name, "weekend");
    }
}

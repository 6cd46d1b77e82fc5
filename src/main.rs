//! crewkit 入口：解析参数、加载配置、组装 crew 并执行一次 kickoff，打印最终文本。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crewkit::config::{load_config, AppConfig};
use crewkit::crews::{research_inputs, run_crew, weekend_inputs, CrewKind, ResearchRequest, WeekendRequest};
use crewkit::llm::{create_llm_from_config, llm_configured};
use crewkit::observability;
use crewkit::tools::default_registry;

#[derive(Parser, Debug)]
#[command(name = "crewkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a research or weekend-planning crew")]
struct Cli {
    /// Which crew to run
    #[arg(long, value_enum, default_value = "research")]
    mode: CrewKind,

    /// Theme for the research
    #[arg(long)]
    theme: Option<String>,

    /// Purpose of the research
    #[arg(long)]
    purpose: Option<String>,

    /// Client background information
    #[arg(long = "client-background", alias = "client_background")]
    client_background: Option<String>,

    /// 希望エリア (e.g., 東京23区)
    #[arg(long)]
    location: Option<String>,

    /// 興味・やりたいこと
    #[arg(long)]
    interests: Option<String>,

    /// 予算感 (e.g., 1人1万円以内)
    #[arg(long)]
    budget: Option<String>,

    /// 同伴者 (e.g., 友人2人)
    #[arg(long)]
    companions: Option<String>,

    /// 天気の概要 (e.g., 晴れ時々曇り)
    #[arg(long)]
    weather: Option<String>,

    /// Extra config file layered over config/default.toml
    #[arg(long, env = "CREWKIT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (cfg, load_error) = match load_config(cli.config.clone()) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    observability::init(&cfg.app.log_level);
    if let Some(e) = load_error {
        tracing::warn!("Failed to load config: {}, using defaults", e);
    }
    tracing::info!(app = %cfg.app.name, mode = cli.mode.name(), "starting");

    let now = chrono::Local::now();
    let inputs = match cli.mode {
        CrewKind::Research => {
            let defaults = ResearchRequest::default();
            research_inputs(
                &ResearchRequest {
                    theme: cli.theme.unwrap_or(defaults.theme),
                    purpose: cli.purpose.unwrap_or(defaults.purpose),
                    client_background: cli.client_background.unwrap_or(defaults.client_background),
                },
                now,
            )
        }
        CrewKind::Weekend => {
            let defaults = WeekendRequest::default();
            weekend_inputs(
                &WeekendRequest {
                    location: cli.location.unwrap_or(defaults.location),
                    interests: cli.interests.unwrap_or(defaults.interests),
                    budget: cli.budget.unwrap_or(defaults.budget),
                    companions: cli.companions.unwrap_or(defaults.companions),
                    weather: cli.weather.unwrap_or(defaults.weather),
                },
                now,
            )
        }
    };

    let llm = create_llm_from_config(&cfg);
    let registry = Arc::new(default_registry(&cfg.tools));
    let output = run_crew(cli.mode, &inputs, &cfg, llm, registry, llm_configured())
        .await
        .with_context(|| format!("An error occurred while running the {} crew", cli.mode.name()))?;

    println!("{}", output.raw);
    Ok(())
}

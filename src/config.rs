//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CREWKIT__*` 覆盖（双下划线表示嵌套，如 `CREWKIT__LLM__PROVIDER=openai`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::tools::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_TOOL_TIMEOUT_SECS};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub crew: CrewSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 未设置 RUST_LOG 时使用的日志级别
    pub log_level: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "crewkit".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub deepseek: LlmDeepSeekSection,
    pub openai: LlmOpenAiSection,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [tools] 段：工具超时、结果长度上限与各外部服务端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    /// 工具内部单个 HTTP 请求的超时（秒），实际值见 `http_timeout()`
    pub http_timeout_secs: u64,
    pub max_result_chars: usize,
    pub weather: WeatherSection,
    pub maps: MapsSection,
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_result_chars: 8000,
            weather: WeatherSection::default(),
            maps: MapsSection::default(),
            search: SearchSection::default(),
        }
    }
}

impl ToolsSection {
    /// 单个 HTTP 请求的超时
    ///
    /// 天气工具在一次调用内串行发出两个请求（地理编码 + 预报），
    /// 因此上限为工具超时的 2/5，保证两个请求都超时后仍能在 ToolInvoker 的期限内返回错误文本。
    pub fn http_timeout(&self) -> Duration {
        let budget_ms = self.tool_timeout_secs.saturating_mul(1000) * 2 / 5;
        let configured_ms = self.http_timeout_secs.saturating_mul(1000);
        Duration::from_millis(configured_ms.min(budget_ms).max(1))
    }
}

/// [tools.weather] 段：Open-Meteo 端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherSection {
    pub geocoding_url: String,
    pub forecast_url: String,
    /// 可查询的预报天数
    pub forecast_days: u32,
    pub timezone: String,
    pub language: String,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            forecast_days: 7,
            timezone: "Asia/Tokyo".to_string(),
            language: "ja".to_string(),
        }
    }
}

/// [tools.maps] 段：Google Maps Web Service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapsSection {
    pub base_url: String,
    pub language: String,
}

impl Default for MapsSection {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            language: "ja".to_string(),
        }
    }
}

/// [tools.search] 段：Serper 端点与返回条数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub endpoint: String,
    pub num_results: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: "https://google.serper.dev/search".to_string(),
            num_results: 5,
        }
    }
}

/// [crew] 段：ReAct 步数上限、层级流程重新委派次数、自定义 crew 定义目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrewSection {
    pub max_react_steps: usize,
    pub max_redelegations: u32,
    /// 存在 `<dir>/research.toml` / `<dir>/weekend.toml` 时覆盖内置定义
    pub definitions_dir: Option<PathBuf>,
}

impl Default for CrewSection {
    fn default() -> Self {
        Self {
            max_react_steps: 20,
            max_redelegations: 0,
            definitions_dir: None,
        }
    }
}

/// 从 config 目录加载配置，环境变量 CREWKIT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CREWKIT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, ignoring");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CREWKIT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

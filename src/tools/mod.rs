pub mod executor;
pub mod maps;
pub mod registry;
pub mod schema;
pub mod search;
pub mod weather;

use std::fmt::Display;
use std::sync::Arc;

pub use executor::ToolInvoker;
pub use maps::{DirectionsTool, DistanceMatrixTool, GoogleMapsClient, MapsApi, TravelMode};
pub use registry::{Tool, ToolError, ToolRegistry};
pub use schema::tool_call_schema_json;
pub use search::SerperSearchTool;
pub use weather::OpenMeteoTool;

use crate::config::ToolsSection;

/// 单次工具调用的默认超时（秒）
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 10;
/// 工具内部单个 HTTP 请求的默认超时（秒）
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 4;

/// 以文本形式返回的失败结果统一以此开头
pub const ERROR_MARKER: &str = "エラー:";

pub fn error_text(message: impl Display) -> String {
    format!("{ERROR_MARKER} {message}")
}

pub fn is_error_text(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_MARKER)
}

/// 超时与连接失败视为瞬时故障
pub(crate) fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

/// 注册内置工具：weather_forecast / maps_directions / maps_distance_matrix / web_search
pub fn default_registry(cfg: &ToolsSection) -> ToolRegistry {
    let timeout = cfg.http_timeout();
    let maps: Option<Arc<dyn MapsApi>> = GoogleMapsClient::from_env(&cfg.maps, timeout)
        .map(|c| Arc::new(c) as Arc<dyn MapsApi>);
    if maps.is_none() {
        tracing::warn!("GOOGLE_MAPS_API_KEY not set; maps tools will report missing credentials");
    }

    let mut registry = ToolRegistry::new();
    registry.register(OpenMeteoTool::new(&cfg.weather, timeout));
    registry.register(DirectionsTool::new(maps.clone()));
    registry.register(DistanceMatrixTool::new(maps));
    registry.register(SerperSearchTool::from_env(
        &cfg.search,
        timeout,
        cfg.max_result_chars,
    ));
    registry
}

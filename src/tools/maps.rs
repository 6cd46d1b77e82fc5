//! 路线工具（Google Maps Directions / Distance Matrix）
//!
//! MapsApi 抽象 HTTP 后端，GoogleMapsClient 为默认实现；工具本身只负责参数解析与文本格式化。
//! 未设置 GOOGLE_MAPS_API_KEY 时两个工具都返回「エラー:」文本而不是报错。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::MapsSection;
use crate::tools::schema::args_schema;
use crate::tools::{error_text, is_transient, Tool, ToolError};

pub const MAPS_API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// 移动手段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Driving,
    Transit,
    Walking,
    Bicycling,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
        }
    }

    /// 日文显示名
    pub fn label(&self) -> &'static str {
        match self {
            TravelMode::Driving => "自動車",
            TravelMode::Transit => "公共交通機関",
            TravelMode::Walking => "徒歩",
            TravelMode::Bicycling => "自転車",
        }
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "driving" => Ok(TravelMode::Driving),
            "transit" => Ok(TravelMode::Transit),
            "walking" => Ok(TravelMode::Walking),
            "bicycling" => Ok(TravelMode::Bicycling),
            other => Err(format!("未対応の移動手段です: {other}")),
        }
    }
}

/// 一次路线查询
#[derive(Debug, Clone)]
pub struct RouteQuery {
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
    pub departure: DateTime<Local>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextValue {
    pub text: String,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fare {
    #[serde(default)]
    pub currency: Option<String>,
    pub value: f64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub fare: Option<Fare>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leg {
    pub duration: TextValue,
    pub distance: TextValue,
    #[serde(default)]
    pub duration_in_traffic: Option<TextValue>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub travel_mode: String,
    pub duration: TextValue,
    pub distance: TextValue,
    #[serde(default)]
    pub transit_details: Option<TransitDetails>,
    #[serde(default)]
    pub fare: Option<Fare>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitDetails {
    pub departure_stop: Stop,
    pub arrival_stop: Stop,
    #[serde(default)]
    pub num_stops: u32,
    pub line: TransitLine,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stop {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitLine {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    pub vehicle: Vehicle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vehicle {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixRow {
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixElement {
    pub status: String,
    #[serde(default)]
    pub duration: Option<TextValue>,
    #[serde(default)]
    pub distance: Option<TextValue>,
    #[serde(default)]
    pub duration_in_traffic: Option<TextValue>,
}

/// 地图后端错误
#[derive(Debug, Clone)]
pub enum MapsError {
    /// 超时 / 连接失败，可重试
    Transient(ToolError),
    /// API 返回非 OK 状态（REQUEST_DENIED、OVER_QUERY_LIMIT 等）
    Api { status: String, message: Option<String> },
    /// 其他失败（HTTP 状态、响应格式）
    Failed(String),
}

impl fmt::Display for MapsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapsError::Transient(e) => write!(f, "{e}"),
            MapsError::Api { status, message: Some(m) } => write!(f, "{status}: {m}"),
            MapsError::Api { status, message: None } => write!(f, "{status}"),
            MapsError::Failed(m) => write!(f, "{m}"),
        }
    }
}

impl From<reqwest::Error> for MapsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MapsError::Transient(ToolError::Timeout(e.to_string()))
        } else if is_transient(&e) {
            MapsError::Transient(ToolError::Transient(e.to_string()))
        } else {
            MapsError::Failed(e.to_string())
        }
    }
}

/// 地图 API 后端
#[async_trait]
pub trait MapsApi: Send + Sync {
    async fn directions(&self, query: &RouteQuery) -> Result<DirectionsResponse, MapsError>;

    async fn distance_matrix(&self, query: &RouteQuery) -> Result<DistanceMatrixResponse, MapsError>;
}

/// Google Maps Web Service 客户端
pub struct GoogleMapsClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl GoogleMapsClient {
    /// timeout 为单个 HTTP 请求的超时
    pub fn new(api_key: impl Into<String>, cfg: &MapsSection, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            language: cfg.language.clone(),
        }
    }

    /// 从环境变量读取 API Key；未设置时返回 None
    pub fn from_env(cfg: &MapsSection, timeout: Duration) -> Option<Self> {
        std::env::var(MAPS_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|key| Self::new(key, cfg, timeout))
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, MapsError> {
        let url = format!("{}/{}/json", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("language", self.language.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(MapsError::Failed(format!("HTTP {}", resp.status())));
        }
        Ok(resp.json().await?)
    }
}

fn check_status(status: &str, message: &Option<String>) -> Result<(), MapsError> {
    match status {
        "OK" | "ZERO_RESULTS" | "NOT_FOUND" => Ok(()),
        other => Err(MapsError::Api {
            status: other.to_string(),
            message: message.clone(),
        }),
    }
}

#[async_trait]
impl MapsApi for GoogleMapsClient {
    async fn directions(&self, query: &RouteQuery) -> Result<DirectionsResponse, MapsError> {
        let resp: DirectionsResponse = self
            .get(
                "directions",
                &[
                    ("origin", query.origin.clone()),
                    ("destination", query.destination.clone()),
                    ("mode", query.mode.as_str().to_string()),
                    ("departure_time", query.departure.timestamp().to_string()),
                    ("alternatives", "true".to_string()),
                ],
            )
            .await?;
        check_status(&resp.status, &resp.error_message)?;
        Ok(resp)
    }

    async fn distance_matrix(&self, query: &RouteQuery) -> Result<DistanceMatrixResponse, MapsError> {
        let resp: DistanceMatrixResponse = self
            .get(
                "distancematrix",
                &[
                    ("origins", query.origin.clone()),
                    ("destinations", query.destination.clone()),
                    ("mode", query.mode.as_str().to_string()),
                    ("departure_time", query.departure.timestamp().to_string()),
                ],
            )
            .await?;
        check_status(&resp.status, &resp.error_message)?;
        Ok(resp)
    }
}

/// 解析出发时刻：空 / "now" 为当前时刻，否则 ISO-8601（可带时区）
pub fn parse_departure(input: Option<&str>) -> Result<DateTime<Local>, String> {
    let raw = match input.map(str::trim) {
        None | Some("") => return Ok(Local::now()),
        Some(s) if s.eq_ignore_ascii_case("now") => return Ok(Local::now()),
        Some(s) => s,
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Local));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            if let Some(dt) = Local.from_local_datetime(&naive).earliest() {
                return Ok(dt);
            }
        }
    }
    Err(format!("出発時刻の形式が不正です: {raw}"))
}

fn missing_key_text() -> String {
    error_text(format!("{MAPS_API_KEY_ENV}環境変数が設定されていません。"))
}

fn api_error_text(e: &MapsError) -> String {
    error_text(format!("Google Maps APIエラー: {e}"))
}

/// 表格单元格内不能出现竖线
fn cell(text: &str) -> String {
    text.replace('|', "／").replace('\n', " ")
}

/// 渲染路线检索结果（最多 3 条）
pub fn render_directions(query: &RouteQuery, routes: &[Route]) -> String {
    if routes.is_empty() {
        return error_text(format!(
            "{}から{}への経路が見つかりませんでした。",
            query.origin, query.destination
        ));
    }

    let mut out = format!("# {} → {} の経路情報\n\n", query.origin, query.destination);
    out += &format!("**移動手段**: {}\n", query.mode.label());
    out += &format!("**出発時刻**: {}\n\n", query.departure.format("%Y年%m月%d日 %H:%M"));

    for (idx, route) in routes.iter().take(3).enumerate() {
        let Some(leg) = route.legs.first() else {
            continue;
        };
        out += &format!("## ルート {}\n\n", idx + 1);
        out += &format!("- **所要時間**: {}\n", leg.duration.text);
        out += &format!("- **距離**: {}\n", leg.distance.text);

        if query.mode == TravelMode::Driving {
            if let Some(traffic) = &leg.duration_in_traffic {
                out += &format!("- **渋滞時の所要時間**: {}\n", traffic.text);
            }
        }

        if query.mode == TravelMode::Transit {
            out += "\n### 乗り換え詳細\n\n";
            let mut total_fare = 0.0;
            for (step_idx, step) in leg.steps.iter().enumerate() {
                let n = step_idx + 1;
                match (step.travel_mode.as_str(), &step.transit_details) {
                    ("TRANSIT", Some(transit)) => {
                        let line = &transit.line;
                        let line_name = line
                            .short_name
                            .clone()
                            .or_else(|| line.name.clone())
                            .unwrap_or_default();
                        out += &format!("{}. **{}** ({})\n", n, line.vehicle.name, line_name);
                        out += &format!("   - 乗車: {}\n", transit.departure_stop.name);
                        out += &format!("   - 下車: {}\n", transit.arrival_stop.name);
                        out += &format!("   - 停車駅数: {}駅\n", transit.num_stops);
                        if let Some(fare) = &step.fare {
                            total_fare += fare.value;
                            out += &format!("   - 運賃: {}円\n", fare.value);
                        }
                        out += "\n";
                    }
                    ("WALKING", _) => {
                        out += &format!(
                            "{}. 徒歩: {} ({})\n\n",
                            n, step.duration.text, step.distance.text
                        );
                    }
                    _ => {}
                }
            }
            if total_fare <= 0.0 {
                total_fare = route.fare.as_ref().map(|f| f.value).unwrap_or_default();
            }
            if total_fare > 0.0 {
                out += &format!("**合計運賃**: 約{}円\n", total_fare);
            }
        }
        out += "\n";
    }
    out
}

/// 渲染距离矩阵中的一行
fn matrix_row(mode: TravelMode, result: Result<DistanceMatrixResponse, MapsError>) -> String {
    let resp = match result {
        Ok(r) => r,
        Err(e) => return format!("| {} | エラー | - | {} |\n", mode.label(), cell(&e.to_string())),
    };
    let element = resp
        .rows
        .first()
        .and_then(|row| row.elements.first())
        .filter(|el| el.status == "OK");
    match element {
        Some(el) => {
            let duration = el.duration.as_ref().map(|d| d.text.as_str()).unwrap_or("-");
            let distance = el.distance.as_ref().map(|d| d.text.as_str()).unwrap_or("-");
            let note = match (&el.duration_in_traffic, mode) {
                (Some(traffic), TravelMode::Driving) => format!("渋滞時: {}", traffic.text),
                _ => String::new(),
            };
            format!(
                "| {} | {} | {} | {} |\n",
                mode.label(),
                cell(duration),
                cell(distance),
                cell(&note)
            )
        }
        None => format!("| {} | 利用不可 | - | - |\n", mode.label()),
    }
}

/// 比较表固定的行顺序
pub const COMPARISON_MODES: [TravelMode; 3] =
    [TravelMode::Driving, TravelMode::Transit, TravelMode::Walking];

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DirectionsArgs {
    /// 出発地点の住所または地名（例: '東京駅'）
    pub origin: String,
    /// 目的地の住所または地名（例: '横浜駅'）
    pub destination: String,
    /// 移動手段: driving / transit / walking / bicycling（既定 transit）
    #[serde(default)]
    pub mode: Option<String>,
    /// 出発時刻（ISO形式 または 'now'）
    #[serde(default)]
    pub departure_time: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DistanceMatrixArgs {
    /// 出発地点の住所または地名
    pub origin: String,
    /// 目的地の住所または地名
    pub destination: String,
    /// 出発時刻（ISO形式 または 'now'）
    #[serde(default)]
    pub departure_time: Option<String>,
}

/// 路线检索工具
pub struct DirectionsTool {
    api: Option<Arc<dyn MapsApi>>,
}

impl DirectionsTool {
    /// api 为 None 表示缺少凭证
    pub fn new(api: Option<Arc<dyn MapsApi>>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for DirectionsTool {
    fn name(&self) -> &str {
        "maps_directions"
    }

    fn description(&self) -> &str {
        "出発地から目的地までの詳細な経路情報を取得します（自動車・公共交通機関・徒歩・自転車）。\
         所要時間、距離、乗り換え情報、運賃情報を含む最大3ルートを返します。"
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<DirectionsArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let Some(api) = &self.api else {
            return Ok(missing_key_text());
        };
        let args: DirectionsArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return Ok(error_text(format!("引数が不正です: {e}"))),
        };
        let mode = match args.mode.as_deref().unwrap_or("transit").parse::<TravelMode>() {
            Ok(m) => m,
            Err(e) => return Ok(error_text(e)),
        };
        let departure = match parse_departure(args.departure_time.as_deref()) {
            Ok(d) => d,
            Err(e) => return Ok(error_text(e)),
        };
        let query = RouteQuery {
            origin: args.origin,
            destination: args.destination,
            mode,
            departure,
        };
        tracing::info!(origin = %query.origin, destination = %query.destination, mode = mode.as_str(), "directions lookup");

        match api.directions(&query).await {
            Ok(resp) => Ok(render_directions(&query, &resp.routes)),
            Err(MapsError::Transient(e)) => Err(e),
            Err(e) => Ok(api_error_text(&e)),
        }
    }
}

/// 多手段比较工具：行顺序固定为 自動車 / 公共交通機関 / 徒歩，各行独立失败
pub struct DistanceMatrixTool {
    api: Option<Arc<dyn MapsApi>>,
}

impl DistanceMatrixTool {
    pub fn new(api: Option<Arc<dyn MapsApi>>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for DistanceMatrixTool {
    fn name(&self) -> &str {
        "maps_distance_matrix"
    }

    fn description(&self) -> &str {
        "出発地から目的地までの所要時間と距離を、複数の移動手段（自動車、公共交通機関、徒歩）で一度に比較します。"
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<DistanceMatrixArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let Some(api) = &self.api else {
            return Ok(missing_key_text());
        };
        let args: DistanceMatrixArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return Ok(error_text(format!("引数が不正です: {e}"))),
        };
        let departure = match parse_departure(args.departure_time.as_deref()) {
            Ok(d) => d,
            Err(e) => return Ok(error_text(e)),
        };
        tracing::info!(origin = %args.origin, destination = %args.destination, "distance matrix lookup");

        let mut out = format!("# {} → {} の移動手段比較\n\n", args.origin, args.destination);
        out += &format!("**出発時刻**: {}\n\n", departure.format("%Y年%m月%d日 %H:%M"));
        out += "| 移動手段 | 所要時間 | 距離 | 備考 |\n";
        out += "|---------|---------|------|------|\n";

        // 三行并发查询，单行挂起只会在自身的 HTTP 超时后变成该行的错误
        let query = |mode| RouteQuery {
            origin: args.origin.clone(),
            destination: args.destination.clone(),
            mode,
            departure,
        };
        let [driving, transit, walking] = COMPARISON_MODES.map(query);
        let (driving, transit, walking) = tokio::join!(
            api.distance_matrix(&driving),
            api.distance_matrix(&transit),
            api.distance_matrix(&walking),
        );

        for (mode, result) in COMPARISON_MODES.into_iter().zip([driving, transit, walking]) {
            if let Err(e) = &result {
                tracing::warn!(mode = mode.as_str(), error = %e, "distance matrix row failed");
            }
            out += &matrix_row(mode, result);
        }

        out += "\n**推奨**: より詳細な情報が必要な場合は、maps_directions ツールを使用してください。\n";
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::is_error_text;

    /// 假后端：transit 行失败，walking 行不可用
    struct FakeMaps;

    fn element(duration: &str, distance: &str) -> Value {
        serde_json::json!({
            "status": "OK",
            "duration": {"text": duration, "value": 1},
            "distance": {"text": distance, "value": 1},
            "duration_in_traffic": {"text": "45分", "value": 1}
        })
    }

    #[async_trait]
    impl MapsApi for FakeMaps {
        async fn directions(&self, query: &RouteQuery) -> Result<DirectionsResponse, MapsError> {
            if query.destination == "どこにもない駅" {
                return Ok(serde_json::from_value(serde_json::json!({"status": "ZERO_RESULTS", "routes": []})).unwrap());
            }
            Ok(serde_json::from_value(serde_json::json!({
                "status": "OK",
                "routes": [{
                    "legs": [{
                        "duration": {"text": "40分", "value": 2400},
                        "distance": {"text": "28.8 km", "value": 28800},
                        "steps": [
                            {"travel_mode": "WALKING", "duration": {"text": "3分"}, "distance": {"text": "200 m"}},
                            {"travel_mode": "TRANSIT", "duration": {"text": "35分"}, "distance": {"text": "28 km"},
                             "transit_details": {
                                 "departure_stop": {"name": "東京"},
                                 "arrival_stop": {"name": "横浜"},
                                 "num_stops": 4,
                                 "line": {"name": "東海道線", "vehicle": {"name": "電車"}}
                             },
                             "fare": {"value": 490}}
                        ]
                    }]
                }]
            }))
            .unwrap())
        }

        async fn distance_matrix(&self, query: &RouteQuery) -> Result<DistanceMatrixResponse, MapsError> {
            match query.mode {
                TravelMode::Driving => Ok(serde_json::from_value(serde_json::json!({
                    "status": "OK",
                    "rows": [{"elements": [element("38分", "31.2 km")]}]
                }))
                .unwrap()),
                TravelMode::Transit => Err(MapsError::Transient(ToolError::Timeout("deadline".into()))),
                _ => Ok(serde_json::from_value(serde_json::json!({
                    "status": "OK",
                    "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]
                }))
                .unwrap()),
            }
        }
    }

    fn fake() -> Option<Arc<dyn MapsApi>> {
        Some(Arc::new(FakeMaps))
    }

    #[tokio::test]
    async fn test_missing_credentials_return_error_text() {
        let directions = DirectionsTool::new(None);
        let out = directions
            .execute(serde_json::json!({"origin": "東京駅", "destination": "横浜駅"}))
            .await
            .unwrap();
        assert!(is_error_text(&out));
        assert!(out.contains(MAPS_API_KEY_ENV));

        let matrix = DistanceMatrixTool::new(None);
        let out = matrix
            .execute(serde_json::json!({"origin": "東京駅", "destination": "横浜駅"}))
            .await
            .unwrap();
        assert!(is_error_text(&out));
    }

    #[tokio::test]
    async fn test_distance_matrix_rows_fixed_order() {
        let tool = DistanceMatrixTool::new(fake());
        let out = tool
            .execute(serde_json::json!({
                "origin": "東京駅",
                "destination": "横浜駅",
                "departure_time": "now"
            }))
            .await
            .unwrap();

        let rows: Vec<&str> = out
            .lines()
            .filter(|l| l.starts_with("| ") && !l.starts_with("| 移動手段"))
            .collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("| 自動車 | 38分 | 31.2 km | 渋滞時: 45分 |"));
        assert!(rows[1].starts_with("| 公共交通機関 | エラー |"));
        assert_eq!(rows[2], "| 徒歩 | 利用不可 | - | - |");
    }

    #[tokio::test]
    async fn test_directions_transit_details() {
        let tool = DirectionsTool::new(fake());
        let out = tool
            .execute(serde_json::json!({
                "origin": "東京駅",
                "destination": "横浜駅",
                "mode": "transit",
                "departure_time": "2025-11-23T09:00:00"
            }))
            .await
            .unwrap();
        assert!(out.starts_with("# 東京駅 → 横浜駅 の経路情報"));
        assert!(out.contains("**移動手段**: 公共交通機関"));
        assert!(out.contains("**出発時刻**: 2025年11月23日 09:00"));
        assert!(out.contains("## ルート 1"));
        assert!(out.contains("**電車** (東海道線)"));
        assert!(out.contains("停車駅数: 4駅"));
        assert!(out.contains("1. 徒歩: 3分 (200 m)"));
        assert!(out.contains("**合計運賃**: 約490円"));
    }

    #[tokio::test]
    async fn test_directions_no_route_and_bad_mode() {
        let tool = DirectionsTool::new(fake());
        let out = tool
            .execute(serde_json::json!({"origin": "東京駅", "destination": "どこにもない駅"}))
            .await
            .unwrap();
        assert!(is_error_text(&out));
        assert!(out.contains("経路が見つかりませんでした"));

        let out = tool
            .execute(serde_json::json!({"origin": "a", "destination": "b", "mode": "flying"}))
            .await
            .unwrap();
        assert!(is_error_text(&out));
    }

    #[test]
    fn test_parse_departure() {
        assert!(parse_departure(None).is_ok());
        assert!(parse_departure(Some("NOW")).is_ok());
        let dt = parse_departure(Some("2025-11-23T09:00:00")).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "09:00");
        assert!(parse_departure(Some("2025-11-23T09:00:00+09:00")).is_ok());
        assert!(parse_departure(Some("tomorrow morning")).is_err());
    }

    #[test]
    fn test_travel_mode_parse() {
        assert_eq!("Driving".parse::<TravelMode>().unwrap(), TravelMode::Driving);
        assert_eq!(TravelMode::Bicycling.label(), "自転車");
        assert!("teleport".parse::<TravelMode>().is_err());
    }
}

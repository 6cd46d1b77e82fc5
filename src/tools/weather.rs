//! 天気予報工具（Open-Meteo，无需 API Key）
//!
//! 两步查询：地名 -> 地理编码 -> 按坐标取 7 日预报；输出多段文本报告（概要、逐小时、出行建议）。
//! 地名解析失败、日期超出预报范围、HTTP/API 失败均以「エラー:」文本返回；超时与连接失败作为瞬时错误交给 ToolInvoker 重试。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::WeatherSection;
use crate::tools::schema::args_schema;
use crate::tools::{error_text, is_transient, Tool, ToolError};

/// 工具参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// 地名（例: '東京', 'Tokyo', '渋谷区'）
    pub location: String,
    /// 日付（YYYY-MM-DD）。省略時は今日
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeoPlace>,
}

/// 地理编码结果
#[derive(Debug, Clone, Deserialize)]
pub struct GeoPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
}

impl GeoPlace {
    /// 「名称（都道府県）, 国」形式的显示名
    pub fn display_name(&self) -> String {
        let mut display = self.name.clone();
        if let Some(admin1) = self.admin1.as_deref().filter(|a| !a.is_empty() && *a != self.name) {
            display = format!("{}（{}）", display, admin1);
        }
        if let Some(country) = self.country.as_deref().filter(|c| !c.is_empty()) {
            display = format!("{}, {}", display, country);
        }
        display
    }
}

/// 预报 API 响应（只取用到的字段）
#[derive(Debug, Default, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub daily: DailyForecast,
    #[serde(default)]
    pub hourly: HourlyForecast,
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HourlyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<i64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
}

/// HTTP 层失败：瞬时（重试）或终止（转文本）
enum FetchError {
    Transient(ToolError),
    Failed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Transient(ToolError::Timeout(e.to_string()))
        } else if is_transient(&e) {
            FetchError::Transient(ToolError::Transient(e.to_string()))
        } else {
            FetchError::Failed(e.to_string())
        }
    }
}

/// WMO 天气代码 -> 日文描述
pub fn weather_description(code: i64) -> String {
    let text = match code {
        0 => "快晴",
        1 => "晴れ",
        2 => "一部曇り",
        3 => "曇り",
        45 => "霧",
        48 => "霧氷",
        51 => "小雨",
        53 => "雨",
        55 => "強い雨",
        56 => "凍雨（弱）",
        57 => "凍雨（強）",
        61 => "弱い雨",
        63 => "雨",
        65 => "強い雨",
        66 => "凍った雨（弱）",
        67 => "凍った雨（強）",
        71 => "弱い雪",
        73 => "雪",
        75 => "強い雪",
        77 => "みぞれ",
        80 => "にわか雨（弱）",
        81 => "にわか雨",
        82 => "にわか雨（強）",
        85 => "にわか雪（弱）",
        86 => "にわか雪（強）",
        95 => "雷雨",
        96 => "雷雨と雹（弱）",
        99 => "雷雨と雹（強）",
        other => return format!("不明({other})"),
    };
    text.to_string()
}

fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

fn fmt_temp(v: Option<f64>) -> String {
    v.map(|t| format!("{t:.1}°C")).unwrap_or_else(|| "-".to_string())
}

fn fmt_percent(v: Option<f64>) -> String {
    v.map(|p| format!("{p}%")).unwrap_or_else(|| "-".to_string())
}

/// 由预报数据渲染报告；目标日期不在预报范围内时返回错误文本
pub fn render_report(
    place: &GeoPlace,
    forecast: &ForecastResponse,
    target: NaiveDate,
    forecast_days: u32,
) -> String {
    let daily = &forecast.daily;
    let target_str = target.format("%Y-%m-%d").to_string();
    let Some(day) = daily.time.iter().position(|t| *t == target_str) else {
        return error_text(format!(
            "{}の予報データが見つかりませんでした（予報は{}日先までです）。",
            target_str, forecast_days
        ));
    };

    let max_temp = at(&daily.temperature_2m_max, day);
    let min_temp = at(&daily.temperature_2m_min, day);
    let rain_prob = at(&daily.precipitation_probability_max, day);
    let main_weather = at(&daily.weather_code, day)
        .map(weather_description)
        .unwrap_or_else(|| "-".to_string());

    let mut out = format!("# 天気予報: {}\n", place.display_name());
    out += &format!("**日付:** {}\n\n", target.format("%Y年%m月%d日"));

    out += "## 概要\n";
    out += &format!("- **天気:** {}\n", main_weather);
    out += &format!("- **最高気温:** {}\n", fmt_temp(max_temp));
    out += &format!("- **最低気温:** {}\n", fmt_temp(min_temp));
    out += &format!("- **降水確率:** {}\n\n", fmt_percent(rain_prob));

    out += "## 時間帯別予報\n";
    let hourly = &forecast.hourly;
    for (i, time_str) in hourly.time.iter().enumerate() {
        let Ok(at_time) = NaiveDateTime::parse_from_str(time_str, "%Y-%m-%dT%H:%M") else {
            continue;
        };
        if at_time.date() != target {
            continue;
        }
        out += &format!("\n### {}\n", at_time.format("%H:%M"));
        out += &format!(
            "- 天気: {}\n",
            at(&hourly.weather_code, i)
                .map(weather_description)
                .unwrap_or_else(|| "-".to_string())
        );
        out += &format!("- 気温: {}\n", fmt_temp(at(&hourly.temperature_2m, i)));
        out += &format!("- 湿度: {}\n", fmt_percent(at(&hourly.relative_humidity_2m, i)));
        out += &format!(
            "- 風速: {}\n",
            at(&hourly.wind_speed_10m, i)
                .map(|w| format!("{w:.1} m/s"))
                .unwrap_or_else(|| "-".to_string())
        );
        out += &format!("- 降水確率: {}\n", fmt_percent(at(&hourly.precipitation_probability, i)));
    }

    out += "\n## お出かけアドバイス\n";
    out += &outing_advice(max_temp, min_temp, rain_prob);
    out
}

fn outing_advice(max_temp: Option<f64>, min_temp: Option<f64>, rain_prob: Option<f64>) -> String {
    let mut advice = String::new();
    match rain_prob {
        Some(p) if p > 50.0 => {
            advice += "- ⚠️ 降水確率が高いです。傘や雨具を必ず持参してください。\n";
            advice += "- 屋内施設を中心としたプランをおすすめします。\n";
        }
        Some(p) if p > 20.0 => {
            advice += "- 折りたたみ傘を持参することをおすすめします。\n";
        }
        _ => {}
    }
    match (max_temp, min_temp) {
        (Some(max), _) if max > 30.0 => {
            advice += "- 🌡️ 暑い日です。水分補給と熱中症対策をしっかりと。\n";
            advice += "- 日焼け止め、帽子、サングラスの持参をおすすめします。\n";
        }
        (Some(max), _) if max < 10.0 => {
            advice += "- 🧥 寒い日です。暖かい服装で出かけてください。\n";
            advice += "- カイロやマフラーなどの防寒具があると良いでしょう。\n";
        }
        (Some(max), Some(min)) if min < 15.0 && max > 20.0 => {
            advice += "- 👕 寒暖差があります。調整しやすい服装（上着など）がおすすめです。\n";
        }
        _ => {}
    }
    advice
}

/// Open-Meteo 天气工具
pub struct OpenMeteoTool {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
    forecast_days: u32,
    timezone: String,
    language: String,
}

impl OpenMeteoTool {
    /// timeout 为单个 HTTP 请求的超时；一次查询串行发出两个请求
    pub fn new(cfg: &WeatherSection, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            geocoding_url: cfg.geocoding_url.clone(),
            forecast_url: cfg.forecast_url.clone(),
            forecast_days: cfg.forecast_days,
            timezone: cfg.timezone.clone(),
            language: cfg.language.clone(),
        }
    }

    async fn geocode(&self, location: &str) -> Result<Option<GeoPlace>, FetchError> {
        let resp = self
            .client
            .get(&self.geocoding_url)
            .query(&[
                ("name", location),
                ("count", "1"),
                ("language", self.language.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(FetchError::Failed(format!("HTTP {}", resp.status())));
        }
        let body: GeocodingResponse = resp.json().await?;
        Ok(body.results.into_iter().next())
    }

    async fn fetch_forecast(&self, place: &GeoPlace) -> Result<ForecastResponse, FetchError> {
        let resp = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                (
                    "hourly",
                    "temperature_2m,relative_humidity_2m,precipitation_probability,weather_code,wind_speed_10m"
                        .to_string(),
                ),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max,weather_code"
                        .to_string(),
                ),
                ("wind_speed_unit", "ms".to_string()),
                ("timezone", self.timezone.clone()),
                ("forecast_days", self.forecast_days.to_string()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(FetchError::Failed(format!("HTTP {}", resp.status())));
        }
        Ok(resp.json().await?)
    }

    async fn lookup(&self, args: WeatherArgs) -> Result<String, FetchError> {
        let target = args
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .unwrap_or_else(|| Local::now().date_naive());

        let Some(place) = self.geocode(&args.location).await? else {
            return Ok(error_text(format!(
                "'{}'の位置情報が見つかりませんでした。別の地名をお試しください。",
                args.location
            )));
        };
        tracing::debug!(location = %args.location, resolved = %place.display_name(), "geocoded");

        let forecast = self.fetch_forecast(&place).await?;
        Ok(render_report(&place, &forecast, target, self.forecast_days))
    }
}

#[async_trait]
impl Tool for OpenMeteoTool {
    fn name(&self) -> &str {
        "weather_forecast"
    }

    fn description(&self) -> &str {
        "Open-Meteo APIを使用して、指定された場所の天気予報を取得します。\
         気温、湿度、風速、降水確率などの詳細情報を提供します。Args: {\"location\": \"東京\", \"date\": \"YYYY-MM-DD\"}"
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<WeatherArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: WeatherArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return Ok(error_text(format!("引数が不正です: {e}"))),
        };
        if args.location.trim().is_empty() {
            return Ok(error_text("location が指定されていません。"));
        }
        tracing::info!(location = %args.location, date = ?args.date, "weather tool lookup");
        match self.lookup(args).await {
            Ok(report) => Ok(report),
            Err(FetchError::Transient(e)) => Err(e),
            Err(FetchError::Failed(msg)) => {
                Ok(error_text(format!("天気情報の取得に失敗しました。{msg}")))
            }
        }
    }
}

//! 工具 HTTP 后端集成测试：本地假服务器模拟 Google Maps / Open-Meteo / Serper

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crewkit::config::{MapsSection, SearchSection, ToolsSection, WeatherSection};
use crewkit::tools::{
    is_error_text, DistanceMatrixTool, GoogleMapsClient, MapsApi, OpenMeteoTool, SerperSearchTool, Tool,
    ToolInvoker, ToolRegistry,
};

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse().ok())
        .unwrap_or(0)
}

/// 启动本地 HTTP 服务器，返回 base url；handler 按请求行决定响应，None 表示一直不响应
async fn serve<F>(handler: F) -> String
where
    F: Fn(&str) -> Option<(u16, String)> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let end = loop {
                    if let Some(end) = header_end(&buf) {
                        break end;
                    }
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                };
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                while buf.len() < end + content_length(&head) {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let request_line = head.lines().next().unwrap_or_default().to_string();
                match handler(&request_line) {
                    Some((status, body)) => {
                        let resp = format!(
                            "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        let _ = socket.write_all(resp.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    None => tokio::time::sleep(Duration::from_secs(60)).await,
                }
            });
        }
    });
    format!("http://{addr}")
}

fn tools_section(tool_timeout_secs: u64) -> ToolsSection {
    ToolsSection {
        tool_timeout_secs,
        ..ToolsSection::default()
    }
}

fn matrix_ok() -> String {
    json!({
        "status": "OK",
        "rows": [{"elements": [{
            "status": "OK",
            "duration": {"text": "40分", "value": 2400},
            "distance": {"text": "28.8 km", "value": 28800}
        }]}]
    })
    .to_string()
}

/// driving 行的请求一直挂起：只有该行变成错误，其余两行正常，整体不触发重试
#[tokio::test]
async fn test_hanging_matrix_row_fails_alone() {
    let base = serve(|line: &str| {
        if line.contains("mode=driving") {
            None
        } else {
            Some((200, matrix_ok()))
        }
    })
    .await;

    let tools = tools_section(2);
    let maps = MapsSection {
        base_url: base,
        language: "ja".to_string(),
    };
    let api: Arc<dyn MapsApi> = Arc::new(GoogleMapsClient::new("test-key", &maps, tools.http_timeout()));
    let mut registry = ToolRegistry::new();
    registry.register(DistanceMatrixTool::new(Some(api)));
    let invoker = ToolInvoker::new(
        Arc::new(registry),
        vec!["maps_distance_matrix".to_string()],
        1,
        Duration::from_secs(tools.tool_timeout_secs),
    );

    let out = invoker
        .invoke(
            "maps_distance_matrix",
            json!({"origin": "東京駅", "destination": "横浜駅"}),
        )
        .await
        .unwrap();

    assert!(!is_error_text(&out));
    let rows: Vec<&str> = out
        .lines()
        .filter(|l| l.starts_with("| ") && !l.starts_with("| 移動手段"))
        .collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("| 自動車 | エラー |"));
    assert!(rows[1].starts_with("| 公共交通機関 | 40分 | 28.8 km |"));
    assert!(rows[2].starts_with("| 徒歩 | 40分 | 28.8 km |"));
}

fn weather_tool(base: &str) -> OpenMeteoTool {
    let weather = WeatherSection {
        geocoding_url: format!("{base}/v1/search"),
        forecast_url: format!("{base}/v1/forecast"),
        ..WeatherSection::default()
    };
    OpenMeteoTool::new(&weather, tools_section(2).http_timeout())
}

#[tokio::test]
async fn test_weather_unknown_location_is_error_text() {
    let base = serve(|_line: &str| {
        Some((200, json!({"generationtime_ms": 0.4}).to_string()))
    })
    .await;

    let out = weather_tool(&base)
        .execute(json!({"location": "どこにもない町"}))
        .await
        .unwrap();
    assert!(is_error_text(&out));
    assert!(out.contains("'どこにもない町'の位置情報が見つかりませんでした"));
}

#[tokio::test]
async fn test_weather_http_failure_is_error_text() {
    let base = serve(|_line: &str| Some((500, "{}".to_string()))).await;

    let out = weather_tool(&base)
        .execute(json!({"location": "東京"}))
        .await
        .unwrap();
    assert!(is_error_text(&out));
    assert!(out.contains("天気情報の取得に失敗しました"));
    assert!(out.contains("HTTP 500"));
}

#[tokio::test]
async fn test_weather_geocode_then_forecast() {
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let forecast = json!({
        "daily": {
            "time": [today],
            "temperature_2m_max": [21.0],
            "temperature_2m_min": [16.0],
            "precipitation_probability_max": [10],
            "weather_code": [0]
        },
        "hourly": {
            "time": [format!("{today}T09:00")],
            "temperature_2m": [17.5],
            "relative_humidity_2m": [55],
            "precipitation_probability": [5],
            "weather_code": [0],
            "wind_speed_10m": [2.0]
        }
    })
    .to_string();
    let base = serve(move |line: &str| {
        if line.contains("/v1/search") {
            Some((
                200,
                json!({"results": [{
                    "name": "横浜市",
                    "latitude": 35.44,
                    "longitude": 139.64,
                    "country": "日本",
                    "admin1": "神奈川県"
                }]})
                .to_string(),
            ))
        } else {
            Some((200, forecast.clone()))
        }
    })
    .await;

    let out = weather_tool(&base)
        .execute(json!({"location": "横浜"}))
        .await
        .unwrap();
    assert!(!is_error_text(&out));
    assert!(out.starts_with("# 天気予報: 横浜市（神奈川県）, 日本"));
    assert!(out.contains("- **天気:** 快晴"));
    assert!(out.contains("### 09:00"));
}

/// 服务端错误与其他非 2xx 一样作为错误文本返回，不交给 ToolInvoker 重试
#[tokio::test]
async fn test_search_server_error_is_error_text() {
    let base = serve(|_line: &str| Some((503, "{}".to_string()))).await;
    let search = SearchSection {
        endpoint: format!("{base}/search"),
        ..SearchSection::default()
    };
    let tool = SerperSearchTool::new(
        Some("test-key".to_string()),
        &search,
        tools_section(2).http_timeout(),
        1000,
    );

    let out = tool
        .execute(json!({"query": "週末 イベント", "num_results": 3}))
        .await
        .unwrap();
    assert!(is_error_text(&out));
    assert!(out.contains("HTTP 503"));
}

#[tokio::test]
async fn test_search_honours_num_results() {
    let organic: Vec<_> = (1..=5)
        .map(|i| json!({"title": format!("記事{i}"), "link": format!("https://example.com/{i}")}))
        .collect();
    let body = json!({ "organic": organic }).to_string();
    let base = serve(move |_line: &str| Some((200, body.clone()))).await;
    let search = SearchSection {
        endpoint: format!("{base}/search"),
        ..SearchSection::default()
    };
    let tool = SerperSearchTool::new(
        Some("test-key".to_string()),
        &search,
        tools_section(2).http_timeout(),
        10_000,
    );

    let out = tool
        .execute(json!({"query": "週末 イベント", "num_results": 2}))
        .await
        .unwrap();
    assert!(out.contains("2. [記事2]"));
    assert!(!out.contains("記事3"));
}

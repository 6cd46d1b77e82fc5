//! Web 搜索工具（Serper）
//!
//! POST {endpoint}，X-API-KEY 头鉴权；结果整理为 Markdown 列表，超过 max_result_chars 时截断并追加 ...[truncated]。
//! 未设置 SERPER_API_KEY 时返回「エラー:」文本。非 2xx 响应（含 5xx）同样作为「エラー:」文本返回，只有超时与连接失败交给 ToolInvoker 重试。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SearchSection;
use crate::tools::schema::args_schema;
use crate::tools::{error_text, is_transient, Tool, ToolError};

pub const SERPER_API_KEY_ENV: &str = "SERPER_API_KEY";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchArgs {
    /// 検索クエリ
    pub query: String,
    /// 取得する件数（省略時は設定値）
    #[serde(default)]
    pub num_results: Option<usize>,
}

/// 单次可请求的最大条数
const MAX_NUM_RESULTS: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
struct SerperResponse {
    #[serde(default, rename = "answerBox")]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Serper 搜索工具
pub struct SerperSearchTool {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    num_results: usize,
    max_result_chars: usize,
}

impl SerperSearchTool {
    pub fn new(
        api_key: Option<String>,
        cfg: &SearchSection,
        timeout: Duration,
        max_result_chars: usize,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: cfg.endpoint.clone(),
            num_results: cfg.num_results,
            max_result_chars,
        }
    }

    pub fn from_env(cfg: &SearchSection, timeout: Duration, max_result_chars: usize) -> Self {
        Self::new(
            std::env::var(SERPER_API_KEY_ENV).ok(),
            cfg,
            timeout,
            max_result_chars,
        )
    }

    /// 参数中的 num_results 优先，0 视为未指定
    fn result_count(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.num_results)
            .min(MAX_NUM_RESULTS)
    }

    fn render(&self, query: &str, resp: SerperResponse, limit: usize) -> String {
        if resp.organic.is_empty() && resp.answer_box.is_none() {
            return error_text(format!("「{query}」の検索結果が見つかりませんでした。"));
        }
        let mut out = format!("# 検索結果: {query}\n\n");
        if let Some(answer) = resp
            .answer_box
            .and_then(|b| b.answer.or(b.snippet))
        {
            out += &format!("**回答**: {answer}\n\n");
        }
        for (idx, item) in resp.organic.iter().take(limit).enumerate() {
            out += &format!("{}. [{}]({})\n", idx + 1, item.title, item.link);
            if let Some(date) = &item.date {
                out += &format!("   - 日付: {date}\n");
            }
            if let Some(snippet) = &item.snippet {
                out += &format!("   - {snippet}\n");
            }
        }
        truncate(out, self.max_result_chars)
    }
}

fn request_body(query: &str, num: usize) -> Value {
    serde_json::json!({
        "q": query,
        "gl": "jp",
        "hl": "ja",
        "num": num,
    })
}

fn truncate(body: String, max_chars: usize) -> String {
    if body.chars().count() > max_chars {
        body.chars().take(max_chars).collect::<String>() + "\n...[truncated]"
    } else {
        body
    }
}

#[async_trait]
impl Tool for SerperSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "インターネットを検索し、上位の検索結果（タイトル、URL、概要）を返します。"
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<SearchArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let Some(api_key) = &self.api_key else {
            return Ok(error_text(format!("{SERPER_API_KEY_ENV}環境変数が設定されていません。")));
        };
        let args: SearchArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return Ok(error_text(format!("引数が不正です: {e}"))),
        };
        let query = args.query.trim();
        if query.is_empty() {
            return Ok(error_text("検索クエリが空です。"));
        }
        let num = self.result_count(args.num_results);
        tracing::info!(query = %query, num, "web search");

        let body = request_body(query, num);
        let resp = match self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(ToolError::Timeout(e.to_string())),
            Err(e) if is_transient(&e) => return Err(ToolError::Transient(e.to_string())),
            Err(e) => return Ok(error_text(format!("検索リクエストに失敗しました: {e}"))),
        };
        let status = resp.status();
        if !status.is_success() {
            return Ok(error_text(format!("検索APIエラー: HTTP {status}")));
        }
        match resp.json::<SerperResponse>().await {
            Ok(parsed) => Ok(self.render(query, parsed, num)),
            Err(e) => Ok(error_text(format!("検索結果の解析に失敗しました: {e}"))),
        }
    }
}

//! DeepSeek 预设（OpenAI 兼容端点）

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Key 取 `DEEPSEEK_API_KEY`，未设置时由 OpenAiClient 退回 `OPENAI_API_KEY`
pub fn create_deepseek_client(model: &str) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY").ok();
    OpenAiClient::new(Some(DEEPSEEK_BASE_URL), model, api_key.as_deref())
}

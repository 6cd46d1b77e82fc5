//! 工具相关 JSON Schema 生成（schemars）
//!
//! - tool_call_schema_json：合法 tool call 的结构，注入 Agent system prompt，减少 LLM 输出格式错误
//! - args_schema：由各工具的参数结构体派生 parameters_schema

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 工具调用请求格式：与 Planner 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 weather_forecast、maps_directions、web_search
    pub tool: String,
    /// 工具参数，依工具不同而不同
    pub args: serde_json::Map<String, Value>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 参数结构体的 JSON Schema（Value 形式，供 Tool::parameters_schema 返回）
pub(crate) fn args_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

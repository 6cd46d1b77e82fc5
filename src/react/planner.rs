//! Planner：提示词构建与 Tool Call 解析
//!
//! LLM 每一轮要么输出 JSON Tool Call（{"tool": "...", "args": {...}}），要么输出最终回答；
//! parse_llm_output 从文本中提取 JSON 并解析为 ToolCall 或最终回答。

use serde::{Deserialize, Serialize};

use crate::agent::AgentTurn;
use crate::core::AgentError;
use crate::tools::tool_call_schema_json;

/// LLM 返回的 Tool Call（简化 JSON：{"tool": "weather_forecast", "args": {"location": "..."}}）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Planner 输出
#[derive(Debug, Clone)]
pub enum PlannerOutput {
    /// 最终回答
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 取出候选 JSON：```json 代码块优先，其次第一个 '{' 到最后一个 '}'
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// 解析 LLM 输出
///
/// - 含合法 JSON 且 tool 非空：ToolCall
/// - 无 JSON，或 JSON 不合法但文本里没有 "tool" 键：视为最终回答（回答本身可能含花括号）
/// - 看起来想调用工具但 JSON 不合法：JsonParseError，由循环要求 LLM 修正格式
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();
    let Some(json_str) = extract_json(trimmed) else {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    };

    match serde_json::from_str::<ToolCall>(json_str) {
        Ok(call) if !call.tool.trim().is_empty() => Ok(PlannerOutput::ToolCall(call)),
        Ok(_) => Ok(PlannerOutput::Response(trimmed.to_string())),
        Err(e) if json_str.contains("\"tool\"") => {
            Err(AgentError::JsonParseError(format!("{}: {}", e, json_str)))
        }
        Err(_) => Ok(PlannerOutput::Response(trimmed.to_string())),
    }
}

/// Agent 的 system prompt：角色 / 目标 / 背景 + 可用工具与调用格式
pub fn build_system_prompt(turn: &AgentTurn<'_>) -> String {
    let agent = turn.agent;
    let mut prompt = format!(
        "あなたは「{}」です。\n\n## 目標\n{}\n",
        agent.role.trim(),
        agent.goal.trim()
    );
    if !agent.backstory.trim().is_empty() {
        prompt += &format!("\n## 背景\n{}\n", agent.backstory.trim());
    }

    if turn.tools.bound_tools().is_empty() {
        prompt += "\n## 回答形式\nツールは使用できません。最終回答のみを出力してください。\n";
    } else {
        prompt += &format!(
            "\n## 利用可能なツール\n{}\n\n\
             ## ツール呼び出し形式\n\
             ツールを使う場合は、次の JSON Schema に従った JSON のみを出力してください:\n{}\n\n\
             ツール結果は「Observation」として返されます。結果が「エラー:」で始まる場合も、\
             その情報を踏まえて作業を続けてください。\n\
             十分な情報が集まったら、JSON ではなく最終回答のみを出力してください。\n",
            turn.tools.schema_json(),
            tool_call_schema_json()
        );
    }
    prompt
}

/// 任务 prompt：任务说明、期望输出、此前任务的输出
pub fn build_task_prompt(turn: &AgentTurn<'_>) -> String {
    let mut prompt = format!(
        "## タスク\n{}\n\n## 期待される出力\n{}\n",
        turn.task.description.trim(),
        turn.task.expected_output.trim()
    );
    if !turn.context.is_empty() {
        prompt += &format!(
            "\n## これまでのタスクの成果\n{}\n",
            turn.context.render()
        );
    }
    prompt
}

/// JSON 不合法时追加给 LLM 的修正提示
pub(crate) fn format_correction(error: &AgentError) -> String {
    format!(
        "直前の出力をツール呼び出しとして解析できませんでした（{}）。\
         ツールを使う場合は {{\"tool\": \"...\", \"args\": {{...}}}} の形式の JSON のみを、\
         そうでなければ最終回答のみを出力してください。",
        error
    )
}

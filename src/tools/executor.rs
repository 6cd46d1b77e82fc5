//! 工具调用器
//!
//! 每个 Agent 持有一个 ToolInvoker：只允许调用绑定的工具，对每次调用施加超时；
//! 瞬时故障（工具返回 ToolError 或超时）按 max_retry_limit 立即重试，参数不变，无退避；
//! 重试耗尽返回 AgentError::ToolRetriesExhausted。每次尝试输出一条结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::ToolRegistry;

/// 绑定到某个 Agent 的工具调用器
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    bound: Vec<String>,
    max_retry_limit: u32,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(
        registry: Arc<ToolRegistry>,
        bound: Vec<String>,
        max_retry_limit: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            bound,
            max_retry_limit,
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn bound_tools(&self) -> &[String] {
        &self.bound
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|n| n == name)
    }

    pub fn max_retry_limit(&self) -> u32 {
        self.max_retry_limit
    }

    /// 绑定工具的 schema JSON，拼入 Agent 的 system prompt
    pub fn schema_json(&self) -> String {
        self.registry.schema_json_for(&self.bound)
    }

    /// 调用工具：成功与业务失败都以文本返回；仅结构性错误与重试耗尽返回 Err
    pub async fn invoke(&self, tool_name: &str, args: Value) -> Result<String, AgentError> {
        if !self.is_bound(tool_name) {
            return Err(AgentError::ToolNotBound(tool_name.to_string()));
        }
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::ToolNotBound(tool_name.to_string()))?;

        let attempts = self.max_retry_limit + 1;
        let args_preview = args_preview(&args);
        let mut last_reason = String::new();

        for attempt in 1..=attempts {
            let start = Instant::now();
            let result = timeout(self.timeout, tool.execute(args.clone())).await;

            let (ok, outcome): (bool, &str) = match &result {
                Ok(Ok(_)) => (true, "ok"),
                Ok(Err(_)) => (false, "transient"),
                Err(_) => (false, "timeout"),
            };
            let audit = serde_json::json!({
                "event": "tool_audit",
                "tool": tool_name,
                "ok": ok,
                "outcome": outcome,
                "attempt": attempt,
                "max_attempts": attempts,
                "duration_ms": start.elapsed().as_millis() as u64,
                "args_preview": args_preview,
            });
            tracing::info!(audit = %audit.to_string(), "tool");

            match result {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => last_reason = e.to_string(),
                Err(_) => {
                    last_reason = format!("timed out after {}ms", self.timeout.as_millis())
                }
            }

            if attempt < attempts {
                tracing::warn!(tool = %tool_name, attempt, reason = %last_reason, "transient tool failure, retrying");
            }
        }

        Err(AgentError::ToolRetriesExhausted {
            tool: tool_name.to_string(),
            attempts,
            reason: last_reason,
        })
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

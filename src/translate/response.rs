use serde_json::Value;

use super::anthropic_types::{ResponseContentBlock, StopReason, Usage};
use super::openai_types::{ChatCompletionResponse, ChatErrorResponse, ChatToolCall, ChatUsage};
use crate::error::{ProxyError, Result};

/// Convert upstream tool calls into `tool_use` blocks.
///
/// Arguments that are not a JSON object fail the whole conversion; no input
/// is ever invented for a call.
pub fn tool_calls_to_blocks(calls: &[ChatToolCall]) -> Result<Vec<ResponseContentBlock>> {
    calls
        .iter()
        .map(|tc| {
            let input: Value = serde_json::from_str(&tc.function.arguments).map_err(|e| {
                ProxyError::malformed_tool_arguments(&tc.function.name, e.to_string())
            })?;
            if !input.is_object() {
                return Err(ProxyError::malformed_tool_arguments(
                    &tc.function.name,
                    "arguments must be a JSON object",
                ));
            }

            Ok(ResponseContentBlock::ToolUse {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                input,
            })
        })
        .collect()
}

/// Derive the envelope content and stop reason from the first choice.
///
/// Tool calls win: when any are present only they are surfaced and any text
/// in the same message is dropped. `finish_reason` is not consulted.
pub fn derive_content(
    resp: &ChatCompletionResponse,
) -> Result<(Vec<ResponseContentBlock>, StopReason)> {
    let choice = resp
        .choices
        .first()
        .ok_or_else(|| ProxyError::upstream("Upstream completion contained no choices"))?;

    match choice.message.tool_calls.as_deref() {
        Some(calls) if !calls.is_empty() => Ok((tool_calls_to_blocks(calls)?, StopReason::ToolUse)),
        _ => {
            let text = choice.message.content.clone().unwrap_or_default();
            Ok((vec![ResponseContentBlock::Text { text }], StopReason::EndTurn))
        }
    }
}

pub fn translate_usage(usage: Option<&ChatUsage>) -> Usage {
    usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    })
}

/// Turn an upstream error body into a proxy error, keeping its message.
pub fn upstream_error(status: u16, body: &str) -> ProxyError {
    if let Ok(err) = serde_json::from_str::<ChatErrorResponse>(body) {
        if !err.error.message.trim().is_empty() {
            return ProxyError::upstream(err.error.message);
        }
    }

    let body = body.trim();
    if body.is_empty() {
        ProxyError::upstream_silent()
    } else {
        ProxyError::upstream(format!(
            "Upstream returned status {status}: {}",
            truncate(body, 500)
        ))
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

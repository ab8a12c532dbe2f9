//! Translate Anthropic Messages API requests into flat `OpenAI` Chat Completions requests.
//!
//! Every Anthropic message becomes exactly one flat message. Block content is
//! rendered line by line and joined with `\n`:
//!
//! - `text` is copied verbatim,
//! - `tool_use` becomes `[Tool Use: {name}] {input as compact JSON}`,
//! - `tool_result` becomes `<tool_result>{content as compact JSON}</tool_result>`.
//!
//! The `tool_use_id` of a tool result is not carried into the text. The
//! destination has no slot for it, so the model pairs results with calls by
//! conversation order alone.

use serde_json::{json, Value};

use super::anthropic_types::{ContentBlock, Message, MessageContent, Tool, ToolChoice};
use super::openai_types::{ChatFunction, ChatTool, FlatMessage};

/// Flatten one message into a single role + string message.
pub fn flatten_message(msg: &Message) -> FlatMessage {
    let content = match &msg.content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join("\n"),
    };

    FlatMessage {
        role: msg.role.as_str().to_string(),
        content,
    }
}

/// Flatten a whole conversation, preserving turn order.
pub fn flatten_conversation(messages: &[Message]) -> Vec<FlatMessage> {
    messages.iter().map(flatten_message).collect()
}

fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Text { text } => text.clone(),
        ContentBlock::ToolUse { name, input, .. } => {
            format!("[Tool Use: {name}] {}", compact_json(input))
        }
        ContentBlock::ToolResult { content, .. } => {
            format!("<tool_result>{}</tool_result>", compact_json(content))
        }
    }
}

fn compact_json(value: &Value) -> String {
    // Display on Value is the compact encoding and cannot fail.
    value.to_string()
}

/// Map tool declarations onto function tools. Order kept, duplicates kept.
pub fn translate_tools(tools: &[Tool]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|t| ChatTool {
            tool_type: "function".to_string(),
            function: ChatFunction {
                name: t.name.clone(),
                description: t.description.clone().unwrap_or_default(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

/// Map an Anthropic tool choice onto the `OpenAI` vocabulary.
///
/// Mappings that are not Anthropic-shaped are assumed to already be in the
/// destination format and are forwarded untouched.
pub fn translate_tool_choice(tc: &ToolChoice) -> Value {
    match tc {
        ToolChoice::Mode(mode) => match mode.as_str() {
            "any" => json!("required"),
            other => json!(other),
        },
        ToolChoice::Object(obj) => match obj.get("type").and_then(Value::as_str) {
            Some("auto") => json!("auto"),
            Some("any") => json!("required"),
            Some("none") => json!("none"),
            Some("tool") => match obj.get("name").and_then(Value::as_str) {
                Some(name) => json!({ "type": "function", "function": { "name": name } }),
                None => Value::Object(obj.clone()),
            },
            _ => Value::Object(obj.clone()),
        },
    }
}

/// The max output tokens actually sent upstream.
#[must_use]
pub fn effective_max_tokens(requested: u64, cap: u64) -> u64 {
    requested.min(cap)
}

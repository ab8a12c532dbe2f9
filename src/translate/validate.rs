//! Schema validation for inbound Messages API requests.
//!
//! Walks the raw JSON before any conversion and reports the first violation
//! with its location (`messages[2].content[0].name: ...`). Only once the shape
//! is known to be good is the value deserialized into [`MessagesRequest`].

use serde_json::{Map, Value};

use super::anthropic_types::MessagesRequest;
use crate::error::{ProxyError, Result};

const ROLES: &[&str] = &["user", "assistant"];
const BLOCK_TYPES: &[&str] = &["text", "tool_use", "tool_result"];

/// Validate a parsed JSON body and produce a typed request.
pub fn validate_request(value: &Value) -> Result<MessagesRequest> {
    let obj = value
        .as_object()
        .ok_or_else(|| ProxyError::validation("request body must be a JSON object"))?;

    match obj.get("model") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(invalid("model", "expected a string")),
        None => return Err(missing("model")),
    }

    let messages = match obj.get("messages") {
        Some(Value::Array(messages)) => messages,
        Some(_) => return Err(invalid("messages", "expected an array")),
        None => return Err(missing("messages")),
    };
    if messages.is_empty() {
        return Err(invalid("messages", "must contain at least one message"));
    }
    for (i, message) in messages.iter().enumerate() {
        check_message(message, &format!("messages[{i}]"))?;
    }

    if let Some(system) = present(obj, "system") {
        check_system(system)?;
    }

    if let Some(max_tokens) = present(obj, "max_tokens") {
        if !max_tokens.as_u64().is_some_and(|n| n > 0) {
            return Err(invalid("max_tokens", "expected a positive integer"));
        }
    }

    if let Some(temperature) = present(obj, "temperature") {
        if !temperature.is_number() {
            return Err(invalid("temperature", "expected a number"));
        }
    }

    if let Some(stream) = present(obj, "stream") {
        if !stream.is_boolean() {
            return Err(invalid("stream", "expected a boolean"));
        }
    }

    if let Some(tools) = present(obj, "tools") {
        let tools = tools
            .as_array()
            .ok_or_else(|| invalid("tools", "expected an array"))?;
        for (i, tool) in tools.iter().enumerate() {
            check_tool(tool, &format!("tools[{i}]"))?;
        }
    }

    if let Some(tool_choice) = present(obj, "tool_choice") {
        if !(tool_choice.is_string() || tool_choice.is_object()) {
            return Err(invalid("tool_choice", "expected a string or an object"));
        }
    }

    // Nulls mean "absent"; drop them so serde defaults apply.
    let cleaned: Map<String, Value> = obj
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    serde_json::from_value(Value::Object(cleaned))
        .map_err(|e| ProxyError::validation(format!("invalid request body: {e}")))
}

fn check_message(message: &Value, at: &str) -> Result<()> {
    let obj = message
        .as_object()
        .ok_or_else(|| invalid(at, "expected an object"))?;

    match obj.get("role") {
        Some(Value::String(role)) if ROLES.contains(&role.as_str()) => {}
        Some(Value::String(role)) => {
            return Err(invalid(
                &format!("{at}.role"),
                &format!("unknown role \"{role}\" (expected \"user\" or \"assistant\")"),
            ))
        }
        Some(_) => return Err(invalid(&format!("{at}.role"), "expected a string")),
        None => return Err(missing(&format!("{at}.role"))),
    }

    match obj.get("content") {
        Some(Value::String(_)) => Ok(()),
        Some(Value::Array(blocks)) => {
            for (j, block) in blocks.iter().enumerate() {
                check_block(block, &format!("{at}.content[{j}]"))?;
            }
            Ok(())
        }
        Some(_) => Err(invalid(
            &format!("{at}.content"),
            "expected a string or an array of content blocks",
        )),
        None => Err(missing(&format!("{at}.content"))),
    }
}

fn check_block(block: &Value, at: &str) -> Result<()> {
    let obj = block
        .as_object()
        .ok_or_else(|| invalid(at, "expected a content block object"))?;

    let block_type = match obj.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(_) => return Err(invalid(&format!("{at}.type"), "expected a string")),
        None => return Err(missing(&format!("{at}.type"))),
    };

    match block_type {
        "text" => require_string(obj, "text", at),
        "tool_use" => {
            require_string(obj, "id", at)?;
            require_string(obj, "name", at)?;
            match obj.get("input") {
                Some(Value::Object(_)) => Ok(()),
                Some(_) => Err(invalid(&format!("{at}.input"), "expected an object")),
                None => Err(missing(&format!("{at}.input"))),
            }
        }
        "tool_result" => require_string(obj, "tool_use_id", at),
        other => Err(invalid(
            &format!("{at}.type"),
            &format!(
                "unrecognized content block type \"{other}\" (expected one of {})",
                BLOCK_TYPES.join(", ")
            ),
        )),
    }
}

fn check_tool(tool: &Value, at: &str) -> Result<()> {
    let obj = tool
        .as_object()
        .ok_or_else(|| invalid(at, "expected a tool declaration object"))?;

    require_string(obj, "name", at)?;

    if let Some(description) = present(obj, "description") {
        if !description.is_string() {
            return Err(invalid(&format!("{at}.description"), "expected a string"));
        }
    }

    match obj.get("input_schema") {
        Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(invalid(&format!("{at}.input_schema"), "expected an object")),
        None => Err(missing(&format!("{at}.input_schema"))),
    }
}

fn check_system(system: &Value) -> Result<()> {
    match system {
        Value::String(_) => Ok(()),
        Value::Array(blocks) => {
            for (i, block) in blocks.iter().enumerate() {
                let at = format!("system[{i}]");
                let obj = block
                    .as_object()
                    .ok_or_else(|| invalid(&at, "expected a text block object"))?;
                if obj.get("type").and_then(Value::as_str) != Some("text") {
                    return Err(invalid(&format!("{at}.type"), "expected \"text\""));
                }
                require_string(obj, "text", &at)?;
            }
            Ok(())
        }
        _ => Err(invalid("system", "expected a string or an array of text blocks")),
    }
}

fn require_string(obj: &Map<String, Value>, field: &str, at: &str) -> Result<()> {
    match obj.get(field) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(invalid(&format!("{at}.{field}"), "expected a string")),
        None => Err(missing(&format!("{at}.{field}"))),
    }
}

fn present<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn invalid(at: &str, what: &str) -> ProxyError {
    ProxyError::validation(format!("{at}: {what}"))
}

fn missing(at: &str) -> ProxyError {
    ProxyError::validation(format!("{at}: missing required field"))
}

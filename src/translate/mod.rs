//! API translation between Anthropic and `OpenAI` formats.
//!
//! The core of the proxy: validates inbound requests, flattens block-based
//! conversations into role + string messages, and converts completions back
//! into Anthropic envelopes. All translation functions are pure (no I/O).

pub mod anthropic_types;
pub mod ids;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod validate;

use anthropic_types::{MessagesRequest, MessagesResponse};
use openai_types::{ChatCompletionRequest, ChatCompletionResponse, FlatMessage};

use crate::error::Result;

/// Destination model served by the reference deployment.
pub const DEFAULT_UPSTREAM_MODEL: &str = "moonshotai/kimi-k2-instruct";
/// Hard ceiling on output tokens the upstream accepts.
pub const UPSTREAM_HARD_CAP: u64 = 16384;

/// Both translation directions, parameterized by deployment constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translator {
    pub upstream_model: String,
    pub max_tokens_cap: u64,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(DEFAULT_UPSTREAM_MODEL, UPSTREAM_HARD_CAP)
    }
}

impl Translator {
    pub fn new(upstream_model: impl Into<String>, max_tokens_cap: u64) -> Self {
        Self {
            upstream_model: upstream_model.into(),
            max_tokens_cap,
        }
    }

    #[must_use]
    pub fn effective_max_tokens(&self, requested: u64) -> u64 {
        request::effective_max_tokens(requested, self.max_tokens_cap)
    }

    /// Build the upstream request. A system prompt, if any, leads the conversation.
    pub fn to_upstream(&self, req: &MessagesRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);

        if let Some(ref system) = req.system {
            messages.push(FlatMessage {
                role: "system".to_string(),
                content: system.as_text(),
            });
        }
        messages.extend(request::flatten_conversation(&req.messages));

        // tool_choice without tools is rejected by OpenAI-compatible servers.
        let (tools, tool_choice) = match req.tools.as_deref() {
            Some(tools) if !tools.is_empty() => (
                Some(request::translate_tools(tools)),
                Some(request::translate_tool_choice(&req.tool_choice)),
            ),
            _ => (None, None),
        };

        ChatCompletionRequest {
            model: self.upstream_model.clone(),
            messages,
            temperature: req.temperature,
            max_tokens: self.effective_max_tokens(req.max_tokens),
            tools,
            tool_choice,
        }
    }

    /// Build the caller-facing envelope under a freshly generated id.
    pub fn to_envelope(
        &self,
        resp: &ChatCompletionResponse,
        model_label: &str,
    ) -> Result<MessagesResponse> {
        self.to_envelope_with_id(resp, model_label, ids::generate_message_id())
    }

    /// Like [`Translator::to_envelope`], with an id minted earlier by the caller
    /// so log lines and the response agree.
    pub fn to_envelope_with_id(
        &self,
        resp: &ChatCompletionResponse,
        model_label: &str,
        id: String,
    ) -> Result<MessagesResponse> {
        let (content, stop_reason) = response::derive_content(resp)?;

        Ok(MessagesResponse {
            id,
            response_type: "message".to_string(),
            role: "assistant".to_string(),
            content,
            model: model_label.to_string(),
            stop_reason,
            stop_sequence: None,
            usage: response::translate_usage(resp.usage.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::anthropic_types::*;
    use super::openai_types::*;
    use super::*;
    use serde_json::json;

    fn request(messages: Vec<Message>) -> MessagesRequest {
        MessagesRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            messages,
            system: None,
            max_tokens: 1024,
            temperature: 0.7,
            stream: false,
            tools: None,
            tool_choice: ToolChoice::default(),
        }
    }

    fn user(text: &str) -> Message {
        Message {
            role: Role::User,
            content: MessageContent::Text(text.to_string()),
        }
    }

    #[test]
    fn test_upstream_request_uses_injected_constants() {
        let translator = Translator::new("kimi-test", 2048);
        let mut req = request(vec![user("Hello")]);
        req.max_tokens = 100_000;

        let upstream = translator.to_upstream(&req);
        assert_eq!(upstream.model, "kimi-test");
        assert_eq!(upstream.max_tokens, 2048);
        assert!((upstream.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(upstream.messages.len(), 1);
        assert!(upstream.tools.is_none());
        assert!(upstream.tool_choice.is_none());
    }

    #[test]
    fn test_default_translator() {
        let translator = Translator::default();
        assert_eq!(translator.upstream_model, DEFAULT_UPSTREAM_MODEL);
        assert_eq!(translator.effective_max_tokens(16384), 16384);
        assert_eq!(translator.effective_max_tokens(20000), UPSTREAM_HARD_CAP);
        assert_eq!(translator.effective_max_tokens(1), 1);
    }

    #[test]
    fn test_system_prompt_leads() {
        let mut req = request(vec![user("hi")]);
        req.system = Some(SystemContent::Blocks(vec![
            SystemBlock::Text {
                text: "Be brief.".to_string(),
            },
            SystemBlock::Text {
                text: "Be kind.".to_string(),
            },
        ]));

        let upstream = Translator::default().to_upstream(&req);
        assert_eq!(upstream.messages.len(), 2);
        assert_eq!(upstream.messages[0].role, "system");
        assert_eq!(upstream.messages[0].content, "Be brief.\nBe kind.");
        assert_eq!(upstream.messages[1].role, "user");
    }

    #[test]
    fn test_tools_and_choice_forwarded_together() {
        let mut req = request(vec![user("weather in Oslo?")]);
        req.tools = Some(vec![Tool {
            name: "get_weather".to_string(),
            description: None,
            input_schema: json!({"type": "object"}),
        }]);

        let upstream = Translator::default().to_upstream(&req);
        let tools = upstream.tools.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.description, "");
        assert_eq!(upstream.tool_choice, Some(json!("auto")));

        req.tools = Some(vec![]);
        let upstream = Translator::default().to_upstream(&req);
        assert!(upstream.tools.is_none());
        assert!(upstream.tool_choice.is_none());
    }

    #[test]
    fn test_envelope_from_tool_calls() {
        let resp = ChatCompletionResponse {
            id: "chatcmpl-upstream".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: DEFAULT_UPSTREAM_MODEL.to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: Some(vec![ChatToolCall {
                        id: "call_1".to_string(),
                        call_type: "function".to_string(),
                        function: ChatToolCallFunction {
                            name: "search".to_string(),
                            arguments: r#"{"q":"rust"}"#.to_string(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: Some(ChatUsage {
                prompt_tokens: 12,
                completion_tokens: 7,
                total_tokens: 19,
            }),
        };

        let envelope = Translator::default()
            .to_envelope(&resp, "claude-sonnet-4-20250514")
            .unwrap();

        assert!(ids::is_message_id(&envelope.id));
        assert_ne!(envelope.id, "chatcmpl-upstream");
        assert_eq!(envelope.response_type, "message");
        assert_eq!(envelope.role, "assistant");
        assert_eq!(envelope.model, "claude-sonnet-4-20250514");
        assert_eq!(envelope.stop_reason, StopReason::ToolUse);
        assert!(envelope.stop_sequence.is_none());
        assert_eq!(envelope.usage.input_tokens, 12);
        assert_eq!(envelope.usage.output_tokens, 7);
        assert_eq!(envelope.content.len(), 1);
    }
}

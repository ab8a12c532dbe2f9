//! Error types for the proxy.
//!
//! Every failure is translated exactly once, at the HTTP boundary, into one
//! status code and one error body. [`ProxyError::status_code`] and
//! [`ProxyError::error_type`] define that mapping.

use thiserror::Error;

/// Message returned to callers for failures whose detail must stay in the log.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    /// The inbound body failed schema validation.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// The upstream credential is not set at request time.
    #[error("Environment variable '{env_var}' not set. Set it with your upstream API key.")]
    MissingCredential { env_var: String },

    /// A tool call returned by the upstream carried arguments that are not JSON.
    #[error("Tool call '{tool}' returned malformed arguments: {message}")]
    MalformedToolArguments { tool: String, message: String },

    /// Any failure reported by the upstream invoker.
    #[error("Upstream error: {}", .message.as_deref().unwrap_or("no detail"))]
    Upstream { message: Option<String> },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn missing_credential(env_var: impl Into<String>) -> Self {
        Self::MissingCredential {
            env_var: env_var.into(),
        }
    }

    pub fn malformed_tool_arguments(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedToolArguments {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Upstream failure with a caller-visible message. Blank messages count as none.
    pub fn upstream(msg: impl Into<String>) -> Self {
        let message = msg.into();
        Self::Upstream {
            message: (!message.trim().is_empty()).then_some(message),
        }
    }

    pub fn upstream_silent() -> Self {
        Self::Upstream { message: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the failure is attributed to the request rather than the proxy.
    #[must_use]
    pub fn is_client_facing(&self) -> bool {
        match self {
            Self::Validation { .. }
            | Self::MissingCredential { .. }
            | Self::MalformedToolArguments { .. } => true,
            Self::Upstream { message } => message.is_some(),
            _ => false,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_client_facing() {
            400
        } else {
            500
        }
    }

    #[must_use]
    pub fn error_type(&self) -> &'static str {
        if self.is_client_facing() {
            "invalid_request_error"
        } else {
            "internal_server_error"
        }
    }

    /// The message shown to the caller. Internal failures are never leaked.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream {
                message: Some(message),
            } => message.clone(),
            _ if self.is_client_facing() => self.to_string(),
            _ => GENERIC_INTERNAL_MESSAGE.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_level_errors_are_400() {
        let errors = [
            ProxyError::validation("messages[0].role: unknown role \"system\""),
            ProxyError::missing_credential("GROQ_API_KEY"),
            ProxyError::malformed_tool_arguments("search", "expected value at line 1"),
            ProxyError::upstream("Invalid API key"),
        ];
        for err in errors {
            assert_eq!(err.status_code(), 400, "{err}");
            assert_eq!(err.error_type(), "invalid_request_error");
        }
    }

    #[test]
    fn test_upstream_without_message_is_500() {
        let err = ProxyError::upstream("   ");
        assert!(matches!(err, ProxyError::Upstream { message: None }));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_type(), "internal_server_error");
        assert_eq!(err.public_message(), GENERIC_INTERNAL_MESSAGE);
    }

    #[test]
    fn test_internal_detail_not_leaked() {
        let err = ProxyError::other("secret stack detail");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), GENERIC_INTERNAL_MESSAGE);
    }

    #[test]
    fn test_upstream_message_passed_verbatim() {
        let err = ProxyError::upstream("Rate limit reached");
        assert_eq!(err.public_message(), "Rate limit reached");
    }
}

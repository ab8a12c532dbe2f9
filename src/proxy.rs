use serde_json::{json, Value};

use crate::error::{ProxyError, Result};
use crate::logging::{JournalEntry, LogLevel, SharedLogger, Stage};
use crate::translate::anthropic_types::MessagesResponse;
use crate::translate::ids::generate_message_id;
use crate::translate::validate::validate_request;
use crate::translate::Translator;
use crate::upstream::UpstreamInvoker;

/// Run one request through the pipeline:
/// validate, translate, invoke upstream, translate back.
///
/// Nothing is retained between calls. Any failure aborts the whole request.
pub async fn proxy_messages(
    body: &[u8],
    translator: &Translator,
    upstream: &dyn UpstreamInvoker,
    logger: &SharedLogger,
) -> Result<MessagesResponse> {
    let request_id = generate_message_id();

    let result = run_pipeline(body, translator, upstream, logger, &request_id).await;

    if let Err(ref e) = result {
        let message = format!("Request failed: {e}");
        if e.is_client_facing() {
            logger.warn(Stage::Respond, &request_id, message);
        } else {
            logger.error(Stage::Respond, &request_id, message);
        }
        tracing::warn!(request_id = %request_id, error = %e, "Request failed");
    }

    result
}

async fn run_pipeline(
    body: &[u8],
    translator: &Translator,
    upstream: &dyn UpstreamInvoker,
    logger: &SharedLogger,
    request_id: &str,
) -> Result<MessagesResponse> {
    let raw: Value = serde_json::from_slice(body)
        .map_err(|e| ProxyError::validation(format!("Invalid request body: {e}")))?;
    let req = validate_request(&raw)?;

    logger.info(
        Stage::Validate,
        request_id,
        format!(
            "Request: model={} messages={} tools={}",
            req.model,
            req.messages.len(),
            req.tools.as_ref().map_or(0, Vec::len)
        ),
    );

    if req.stream {
        logger.debug(
            Stage::Validate,
            request_id,
            "stream=true requested; answering with a single response",
        );
    }

    let chat_req = translator.to_upstream(&req);

    if chat_req.max_tokens < req.max_tokens {
        logger.record(
            JournalEntry::new(
                LogLevel::Warn,
                Stage::Translate,
                format!(
                    "max_tokens clamped from {} to {}",
                    req.max_tokens, chat_req.max_tokens
                ),
            )
            .for_request(request_id)
            .with_context(json!({
                "requested": req.max_tokens,
                "effective": chat_req.max_tokens,
            })),
        );
        tracing::warn!(
            request_id,
            requested = req.max_tokens,
            effective = chat_req.max_tokens,
            "max_tokens clamped to upstream cap"
        );
    }

    logger.info(
        Stage::Upstream,
        request_id,
        format!(
            "Invoking upstream model={} messages={}",
            chat_req.model,
            chat_req.messages.len()
        ),
    );

    let completion = upstream.complete(&chat_req).await?;

    let envelope = translator.to_envelope_with_id(&completion, &req.model, request_id.to_string())?;

    logger.info(
        Stage::Respond,
        request_id,
        format!(
            "Completed: stop_reason={:?} blocks={} in={} out={} tokens",
            envelope.stop_reason,
            envelope.content.len(),
            envelope.usage.input_tokens,
            envelope.usage.output_tokens
        ),
    );

    Ok(envelope)
}

use crate::error::ProxyError;
use crate::logging::SharedLogger;
use crate::proxy;
use crate::translate::anthropic_types::ErrorResponse;
use crate::translate::Translator;
use crate::upstream::UpstreamInvoker;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::any::Any as PanicPayload;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub translator: Translator,
    pub upstream: Arc<dyn UpstreamInvoker>,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/v1/messages", post(handle_messages))
        .route("/health", get(handle_health))
        .route("/", get(handle_health))
        .with_state(state);

    with_boundary_layers(routes)
}

fn with_boundary_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn handle_messages(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match proxy::proxy_messages(
        &body,
        &state.translator,
        state.upstream.as_ref(),
        &state.logger,
    )
    .await
    {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e),
    }
}

/// The single place where a failure becomes a status code and an error body.
pub fn error_response(err: &ProxyError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from_error(err))).into_response()
}

/// A handler panic becomes the same 500 body as any other internal failure.
fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    error_response(&ProxyError::other(format!("handler panicked: {detail}")))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GENERIC_INTERNAL_MESSAGE;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_handler_panic_becomes_internal_error_body() {
        async fn boom() -> &'static str {
            panic!("secret panic detail")
        }

        let app = with_boundary_layers(Router::new().route("/boom", get(boom)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let resp = reqwest::get(format!("http://{addr}/boom")).await.unwrap();
        assert_eq!(resp.status(), 500);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body,
            json!({"error": {"type": "internal_server_error", "message": GENERIC_INTERNAL_MESSAGE}})
        );
    }

    #[test]
    fn test_error_response_statuses() {
        assert_eq!(
            error_response(&ProxyError::validation("bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(&ProxyError::missing_credential("GROQ_API_KEY")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(&ProxyError::upstream_silent()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_response(&ProxyError::other("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

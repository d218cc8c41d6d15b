//! Webhook HTTP server — the provider-facing entry point.
//!
//! One POST endpoint dispatches validated events to the status-update or
//! message pipeline; GET serves the provider's verification handshake.
//! Every response, including errors, is a JSON envelope with permissive
//! CORS headers, and bodies never carry stack detail.

mod event;
mod pipeline;

pub use event::{MessageEvent, StatusEvent, WebhookEvent};

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use mbote_core::{
    config::ServerConfig,
    traits::{DeliveryChannel, RecordStore},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::responder::Responder;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub responder: Arc<Responder>,
    pub channel: Arc<dyn DeliveryChannel>,
    pub default_country_prefix: String,
    pub verify_token: String,
}

/// Verification handshake query parameters.
#[derive(Debug, Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode", default)]
    mode: String,
    #[serde(rename = "hub.verify_token", default)]
    verify_token: String,
    #[serde(rename = "hub.challenge", default)]
    challenge: String,
}

/// Build the axum router with shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Permissive CORS: preflights short-circuit to 204, every other
/// response — errors included — carries the same headers.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

/// Start the webhook server.
pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind webhook server to {addr}: {e}"))?;

    info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("webhook server error: {e}"))?;

    Ok(())
}

fn error_envelope(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"success": false, "error": message})))
}

/// `GET /webhook` — provider verification handshake: echo the challenge
/// when the verify token matches.
async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Response {
    if query.mode == "subscribe"
        && !state.verify_token.is_empty()
        && query.verify_token == state.verify_token
    {
        info!("webhook verification succeeded");
        return (StatusCode::OK, query.challenge).into_response();
    }

    warn!("webhook verification rejected (mode={:?})", query.mode);
    error_envelope(StatusCode::FORBIDDEN, "verification failed").into_response()
}

/// `POST /webhook` — the event entry point.
async fn receive(
    State(state): State<AppState>,
    body: Result<Json<Value>, axum::extract::rejection::JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Ok(Json(payload)) = body else {
        return error_envelope(StatusCode::BAD_REQUEST, "invalid JSON body");
    };

    let event = match WebhookEvent::from_value(&payload) {
        Ok(event) => event,
        Err(e) => return error_envelope(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    match event {
        WebhookEvent::NonText => {
            // Non-text events are acknowledged and dropped.
            (
                StatusCode::OK,
                Json(json!({"success": true, "ignored": true})),
            )
        }
        WebhookEvent::StatusUpdate(status) => pipeline::handle_status(&state, status).await,
        WebhookEvent::Message(message) => pipeline::handle_message(&state, message).await,
    }
}

//! Event pipelines behind the webhook endpoint.
//!
//! Message path: sanitize → persist inbound → profile upsert → classify →
//! respond → resolve credentials → deliver → persist outbound. Store
//! failures on the save steps are logged and swallowed — losing a log row
//! is less harmful than failing to answer the user.

use super::{error_envelope, AppState, MessageEvent, StatusEvent};
use axum::{http::StatusCode, response::Json};
use mbote_core::{
    context::ConversationContext,
    error::MboteError,
    intent,
    message::{ConversationMessage, DeliveryStatus},
    phone, sanitize,
    traits::{DeliveryChannel as _, RecordStore as _},
};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{error, info, warn};

/// Apply a delivery-status update. Unknown provider ids succeed anyway —
/// the provider's retry should not be triggered by a local lookup gap —
/// but are logged as a discrepancy.
pub(super) async fn handle_status(
    state: &AppState,
    event: StatusEvent,
) -> (StatusCode, Json<Value>) {
    let Some(next) = DeliveryStatus::parse(&event.status) else {
        warn!(
            "ignoring status update with unknown status {:?} for {}",
            event.status, event.message_id
        );
        return (StatusCode::OK, Json(json!({"success": true, "applied": false})));
    };

    match state.store.transition_delivery(&event.message_id, next).await {
        Ok(applied) => {
            if applied {
                info!("delivery {} -> {}", event.message_id, next.as_str());
            }
            (
                StatusCode::OK,
                Json(json!({"success": true, "applied": applied})),
            )
        }
        Err(e) => {
            error!("status update failed for {}: {e}", event.message_id);
            error_envelope(StatusCode::SERVICE_UNAVAILABLE, "status update failed")
        }
    }
}

/// Run one inbound message through the full pipeline.
pub(super) async fn handle_message(
    state: &AppState,
    event: MessageEvent,
) -> (StatusCode, Json<Value>) {
    let received = Instant::now();

    let clean = match sanitize::sanitize(&event.text) {
        Ok(clean) => clean,
        Err(MboteError::EmptyContent) => {
            return error_envelope(
                StatusCode::BAD_REQUEST,
                "message content empty after sanitization",
            );
        }
        Err(e) => {
            error!("sanitization failed: {e}");
            return error_envelope(StatusCode::BAD_REQUEST, "invalid message content");
        }
    };

    let phone_number = phone::normalize(&event.from, &state.default_country_prefix);
    if !phone::is_valid(&phone_number) {
        // The provider owns the sender address; log and keep going.
        warn!("sender {:?} normalized to non-canonical {phone_number:?}", event.from);
    }

    info!(
        "[whatsapp] inbound from {phone_number} ({} chars)",
        clean.chars().count()
    );

    if let Err(e) = state
        .store
        .append_message(&ConversationMessage::user(&phone_number, &clean))
        .await
    {
        error!("failed to persist inbound message: {e}");
    }

    let profile = match state.store.upsert_profile(&phone_number).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            error!("profile upsert failed for {phone_number}: {e}");
            None
        }
    };

    let intent = intent::classify(&clean);

    let mut context = ConversationContext::for_channel("whatsapp");
    if let Some(profile) = &profile {
        context.education_level = Some(profile.education_level.clone());
        context.subject = profile.subjects.first().cloned();
    }

    let reply = state.responder.respond(intent, &clean, &context).await;
    let response_time = received.elapsed().as_secs_f64();

    info!(
        "[whatsapp] {} reply ready for {phone_number} in {response_time:.2}s",
        intent.as_str()
    );

    // Deliver only when credentials resolve; the bot turn is persisted
    // either way so the conversation record stays complete.
    let delivery = match state.store.resolve_config(None).await {
        Ok(config) => Some(state.channel.send(&phone_number, &reply, None, &config).await),
        Err(MboteError::NoActiveConfig) => {
            warn!("no active WhatsApp config, skipping delivery for {phone_number}");
            None
        }
        Err(e) => {
            error!("credential resolution failed: {e}");
            None
        }
    };

    if let Err(e) = state
        .store
        .append_message(&ConversationMessage::bot(
            &phone_number,
            &reply,
            intent,
            response_time,
        ))
        .await
    {
        error!("failed to persist outbound message: {e}");
    }

    match delivery {
        Some(Ok(record)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "response": reply,
                "messageId": record.provider_message_id,
            })),
        ),
        Some(Err(e)) => {
            error!("delivery to {phone_number} failed: {e}");
            error_envelope(StatusCode::SERVICE_UNAVAILABLE, "message delivery failed")
        }
        None => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "response": reply,
                "delivered": false,
            })),
        ),
    }
}

//! Webhook event parsing and validation.
//!
//! Events are discriminated by an explicit `type` tag. Legacy untagged
//! payloads are accepted on the message path only when both `from` and
//! `text` are present; everything else is rejected before the pipeline
//! sees it.

use mbote_core::error::MboteError;
use serde_json::Value;

/// A validated webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Message(MessageEvent),
    StatusUpdate(StatusEvent),
    /// A tagged message event without text (voice note, sticker, ...).
    /// Terminal no-op: acknowledged and dropped.
    NonText,
}

/// A new inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub from: String,
    pub text: String,
    /// Provider clock, epoch seconds.
    pub timestamp: Option<i64>,
    pub message_id: Option<String>,
}

/// A delivery-status change for a previously sent message.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub message_id: String,
    pub status: String,
}

fn string_field(value: &Value, name: &str) -> Option<String> {
    value
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl WebhookEvent {
    /// Validate a parsed JSON body into an event.
    pub fn from_value(value: &Value) -> Result<Self, MboteError> {
        if !value.is_object() {
            return Err(MboteError::Validation(
                "request body must be a JSON object".into(),
            ));
        }

        match value.get("type").and_then(Value::as_str) {
            Some("status_update") => {
                let message_id = string_field(value, "messageId").ok_or_else(|| {
                    MboteError::Validation("status_update requires messageId".into())
                })?;
                let status = string_field(value, "status").ok_or_else(|| {
                    MboteError::Validation("status_update requires status".into())
                })?;
                Ok(Self::StatusUpdate(StatusEvent { message_id, status }))
            }
            Some("message") => {
                let from = value
                    .get("from")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| MboteError::Validation("message requires from".into()))?;
                match string_field(value, "text") {
                    Some(text) => Ok(Self::Message(MessageEvent {
                        from,
                        text,
                        timestamp: value.get("timestamp").and_then(Value::as_i64),
                        message_id: string_field(value, "messageId"),
                    })),
                    None => Ok(Self::NonText),
                }
            }
            Some(other) => Err(MboteError::Validation(format!(
                "unknown event type {other:?}"
            ))),
            // Legacy untagged payload: message-path iff from + text present.
            None => {
                let from = value.get("from").and_then(Value::as_str).map(str::to_string);
                let text = string_field(value, "text");
                match (from, text) {
                    (Some(from), Some(text)) => Ok(Self::Message(MessageEvent {
                        from,
                        text,
                        timestamp: value.get("timestamp").and_then(Value::as_i64),
                        message_id: string_field(value, "messageId"),
                    })),
                    _ => Err(MboteError::Validation(
                        "missing required fields: from and text".into(),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_message() {
        let event = WebhookEvent::from_value(&json!({
            "type": "message",
            "from": "242061234567",
            "text": "bonjour",
            "timestamp": 1754300000,
            "messageId": "wamid.in.1",
        }))
        .unwrap();
        let WebhookEvent::Message(m) = event else {
            panic!("expected message event");
        };
        assert_eq!(m.from, "242061234567");
        assert_eq!(m.timestamp, Some(1754300000));
        assert_eq!(m.message_id.as_deref(), Some("wamid.in.1"));
    }

    #[test]
    fn test_tagged_message_without_text_is_non_text() {
        let event = WebhookEvent::from_value(&json!({
            "type": "message",
            "from": "242061234567",
        }))
        .unwrap();
        assert_eq!(event, WebhookEvent::NonText);
    }

    #[test]
    fn test_status_update() {
        let event = WebhookEvent::from_value(&json!({
            "type": "status_update",
            "messageId": "wamid.out.1",
            "status": "delivered",
        }))
        .unwrap();
        let WebhookEvent::StatusUpdate(s) = event else {
            panic!("expected status event");
        };
        assert_eq!(s.message_id, "wamid.out.1");
        assert_eq!(s.status, "delivered");
    }

    #[test]
    fn test_status_update_missing_fields_rejected() {
        let err = WebhookEvent::from_value(&json!({
            "type": "status_update",
            "status": "delivered",
        }))
        .unwrap_err();
        assert!(matches!(err, MboteError::Validation(_)));
    }

    #[test]
    fn test_legacy_untagged_message_accepted() {
        let event = WebhookEvent::from_value(&json!({
            "from": "242061234567",
            "text": "bonjour",
        }))
        .unwrap();
        assert!(matches!(event, WebhookEvent::Message(_)));
    }

    #[test]
    fn test_legacy_untagged_without_text_rejected() {
        // No explicit tag, no text: ambiguous shape, rejected.
        let err = WebhookEvent::from_value(&json!({
            "from": "242061234567",
        }))
        .unwrap_err();
        assert!(matches!(err, MboteError::Validation(_)));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = WebhookEvent::from_value(&json!({"type": "reaction"})).unwrap_err();
        assert!(matches!(err, MboteError::Validation(_)));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = WebhookEvent::from_value(&json!(["array"])).unwrap_err();
        assert!(matches!(err, MboteError::Validation(_)));
    }
}

use crate::intent::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum characters a delivery-record preview keeps.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Bot,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

/// One turn in a phone-number-scoped conversation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    /// Canonical E.164 phone number — the conversation grouping key.
    pub phone_number: String,
    /// Sanitized text, at most 4096 characters.
    pub content: String,
    pub sender: SenderRole,
    /// Classification label; absent for pre-classification user turns.
    pub intent: Option<Intent>,
    /// Wall-clock seconds from event receipt to reply-ready; bot turns only.
    pub response_time_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    /// A user turn as received from the webhook.
    pub fn user(phone_number: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phone_number: phone_number.to_string(),
            content: content.to_string(),
            sender: SenderRole::User,
            intent: None,
            response_time_seconds: None,
            created_at: Utc::now(),
        }
    }

    /// A bot turn produced by the responder.
    pub fn bot(
        phone_number: &str,
        content: &str,
        intent: Intent,
        response_time_seconds: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phone_number: phone_number.to_string(),
            content: content.to_string(),
            sender: SenderRole::Bot,
            intent: Some(intent),
            response_time_seconds: Some(response_time_seconds),
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle of one outbound send attempt.
///
/// Allowed transitions: `pending → sent → {delivered, failed}` and
/// `pending → error`. Records are created at send time as `sent` or
/// `error`; `delivered`/`failed` arrive later via status-update webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Error,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Error => "error",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "error" => Some(Self::Error),
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether `self → next` is a legal lifecycle step.
    pub fn can_transition(&self, next: DeliveryStatus) -> bool {
        matches!(
            (*self, next),
            (Self::Pending, Self::Sent)
                | (Self::Pending, Self::Error)
                | (Self::Sent, Self::Delivered)
                | (Self::Sent, Self::Failed)
        )
    }
}

/// Durable log entry for one outbound send attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: String,
    pub phone_number: String,
    /// First 100 characters of the message.
    pub message_preview: String,
    /// Provider-assigned id; absent on failed sends.
    pub provider_message_id: Option<String>,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn sent(phone_number: &str, message: &str, provider_message_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            phone_number: phone_number.to_string(),
            message_preview: preview(message),
            provider_message_id: Some(provider_message_id.to_string()),
            status: DeliveryStatus::Sent,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn errored(phone_number: &str, message: &str, error: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            phone_number: phone_number.to_string(),
            message_preview: preview(message),
            provider_message_id: None,
            status: DeliveryStatus::Error,
            error: Some(error.to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Truncate a message to the preview length on a char boundary.
pub fn preview(message: &str) -> String {
    if message.chars().count() <= PREVIEW_MAX_CHARS {
        message.to_string()
    } else {
        message.chars().take(PREVIEW_MAX_CHARS).collect()
    }
}

/// Media attachment kinds supported by the provider send API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

/// Reference to an already-uploaded media object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    /// Durable URL returned by the object store.
    pub url: String,
}

/// One entry in a batch send request.
#[derive(Debug, Clone, Default)]
pub struct OutboundRequest {
    pub to: String,
    pub message: String,
    /// `{{name}}`-style template variables, substituted before send.
    pub variables: Option<std::collections::HashMap<String, String>>,
    pub media: Option<MediaRef>,
}

/// Per-message outcome of a batch send. Every input item gets exactly one.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResult {
    pub to: String,
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MessageResult {
    pub fn ok(to: &str, provider_message_id: Option<String>) -> Self {
        Self {
            to: to.to_string(),
            success: true,
            provider_message_id,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn err(to: &str, error: impl Into<String>) -> Self {
        Self {
            to: to.to_string(),
            success: false,
            provider_message_id: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// WhatsApp Business credentials, resolved per request from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub id: String,
    /// Owning dashboard user, when the row is user-scoped.
    pub user_id: Option<String>,
    pub access_token: String,
    pub phone_number_id: String,
    pub business_account_id: Option<String>,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

/// Per-phone-number learner profile, created on first contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub phone_number: String,
    pub education_level: String,
    pub subjects: Vec<String>,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Baseline profile for a number seen for the first time.
    pub fn baseline(phone_number: &str) -> Self {
        let now = Utc::now();
        Self {
            phone_number: phone_number.to_string(),
            education_level: "debutant".to_string(),
            subjects: Vec::new(),
            language: "fr".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

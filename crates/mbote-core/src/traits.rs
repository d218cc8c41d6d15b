use crate::{
    context::CompletionRequest,
    error::MboteError,
    message::{
        ConversationMessage, DeliveryRecord, DeliveryStatus, MediaRef, MessageResult,
        OutboundRequest, Profile, WhatsAppConfig,
    },
};
use async_trait::async_trait;

/// LLM provider trait — the brain.
///
/// Any chat-completion backend implements this to generate replies.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Run one completion and return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, MboteError>;

    /// Check if the provider is reachable and configured.
    async fn is_available(&self) -> bool;
}

/// Record store trait — the durable log behind the pipeline.
///
/// Injected into every component; no process-wide singleton. Backed by
/// the hosted database in production, by in-memory fakes in tests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one conversation turn. Append-only; turns are never mutated.
    async fn append_message(&self, message: &ConversationMessage) -> Result<(), MboteError>;

    /// Most recent turns for a phone number, newest first.
    async fn recent_messages(
        &self,
        phone_number: &str,
        limit: i64,
    ) -> Result<Vec<ConversationMessage>, MboteError>;

    /// Create-or-fetch the profile for a phone number.
    ///
    /// Must be upsert-by-unique-key so concurrent duplicate webhook
    /// deliveries cannot double-create a profile.
    async fn upsert_profile(&self, phone_number: &str) -> Result<Profile, MboteError>;

    /// Persist a delivery record as written by the delivery channel.
    async fn insert_delivery(&self, record: &DeliveryRecord) -> Result<(), MboteError>;

    /// Look up a delivery record by provider-assigned message id.
    async fn find_delivery(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<DeliveryRecord>, MboteError>;

    /// Apply a status transition keyed by provider message id.
    ///
    /// Returns `false` when the record is missing or the transition is
    /// not allowed by the delivery lifecycle; neither case is an error.
    async fn transition_delivery(
        &self,
        provider_message_id: &str,
        next: DeliveryStatus,
    ) -> Result<bool, MboteError>;

    /// Resolve WhatsApp credentials: the active row scoped to `user_id`
    /// when given, else the most recently updated active row, else
    /// [`MboteError::NoActiveConfig`].
    async fn resolve_config(&self, user_id: Option<&str>) -> Result<WhatsAppConfig, MboteError>;

    /// Mark a credential row inactive (expired/invalid token).
    async fn deactivate_config(&self, config_id: &str) -> Result<(), MboteError>;
}

/// Delivery channel trait — the outbound messaging provider.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Channel name, e.g. "whatsapp".
    fn name(&self) -> &str;

    /// Send one message, persisting a delivery record on both the
    /// success and the failure path before returning.
    async fn send(
        &self,
        to: &str,
        message: &str,
        media: Option<&MediaRef>,
        config: &WhatsAppConfig,
    ) -> Result<DeliveryRecord, MboteError>;

    /// Paced sequential batch send. Every input item yields exactly one
    /// result; invalid numbers and per-message failures do not abort
    /// the batch.
    async fn send_many(
        &self,
        batch: &[OutboundRequest],
        config: &WhatsAppConfig,
    ) -> Vec<MessageResult>;
}

//! Conversation context passed to the responder and provider.

use serde::{Deserialize, Serialize};

/// Per-sender context carried into response generation.
///
/// Every field is optional — absence never blocks generation, defaults
/// are substituted when the prompt needs a value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Source channel name, e.g. "whatsapp".
    pub channel: String,
    /// Learner level from the profile ("debutant" when unknown).
    pub education_level: Option<String>,
    /// Subject currently studied, when known.
    pub subject: Option<String>,
    /// Prior understanding signal, when known.
    pub understanding: Option<String>,
    /// Requested complexity, when known.
    pub complexity: Option<String>,
}

impl ConversationContext {
    pub fn for_channel(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            ..Self::default()
        }
    }
}

/// A single completion request: system prompt plus the user turn.
///
/// No extended history is replayed — the upstream design sends exactly
/// two turns per exchange.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    /// Override the provider's configured model when set.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system_prompt: &str, user_message: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            user_message: user_message.to_string(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_empty() {
        let ctx = ConversationContext::for_channel("whatsapp");
        assert_eq!(ctx.channel, "whatsapp");
        assert!(ctx.education_level.is_none());
        assert!(ctx.subject.is_none());
    }

    #[test]
    fn test_completion_request_defaults() {
        let req = CompletionRequest::new("sys", "hello");
        assert!(req.model.is_none());
        assert!(req.temperature.is_none());
        assert!(req.max_tokens.is_none());
    }
}

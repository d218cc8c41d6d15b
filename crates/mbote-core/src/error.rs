use thiserror::Error;

/// Top-level error type for Mbote.
#[derive(Debug, Error)]
pub enum MboteError {
    /// Bad or missing request fields — caller input error.
    #[error("validation error: {0}")]
    Validation(String),

    /// No usable WhatsApp credentials could be resolved.
    #[error("no active WhatsApp configuration")]
    NoActiveConfig,

    /// Message content was empty after sanitization.
    #[error("message content empty after sanitization")]
    EmptyContent,

    /// Media attachment URL did not parse.
    #[error("invalid media url: {0}")]
    InvalidMediaUrl(String),

    /// Media attachment URL did not answer the reachability probe.
    #[error("media unreachable: {0}")]
    MediaUnreachable(String),

    /// The messaging provider rejected a send.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        /// True when the provider signalled an expired/invalid token.
        auth_failure: bool,
    },

    /// Error from the LLM provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Record store error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MboteError {
    /// Shorthand for a non-auth delivery failure.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
            auth_failure: false,
        }
    }
}

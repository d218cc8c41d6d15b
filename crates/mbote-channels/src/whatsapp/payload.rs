//! Graph API wire types for the send-message endpoint.

use mbote_core::message::MediaKind;
use serde::{Deserialize, Serialize};

/// Outbound send payload. Exactly one of `text` or a media body is set,
/// matching the `type` discriminator.
#[derive(Debug, Serialize)]
pub struct SendPayload {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<MediaBody>,
}

#[derive(Debug, Serialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MediaBody {
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl SendPayload {
    fn base(to: &str, kind: &'static str) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: to.to_string(),
            kind,
            text: None,
            image: None,
            video: None,
            document: None,
        }
    }

    /// Standalone text message.
    pub fn text(to: &str, body: &str) -> Self {
        Self {
            text: Some(TextBody {
                body: body.to_string(),
            }),
            ..Self::base(to, "text")
        }
    }

    /// Media message with the text attached as a caption.
    pub fn media(to: &str, kind: MediaKind, link: &str, caption: &str) -> Self {
        let body = MediaBody {
            link: link.to_string(),
            caption: if caption.is_empty() {
                None
            } else {
                Some(caption.to_string())
            },
        };
        let mut payload = Self::base(to, kind.as_str());
        match kind {
            MediaKind::Image => payload.image = Some(body),
            MediaKind::Video => payload.video = Some(body),
            MediaKind::Document => payload.document = Some(body),
        }
        payload
    }
}

/// Success response: the provider-assigned message id.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

/// Graph API error envelope.
#[derive(Debug, Deserialize)]
pub struct GraphErrorBody {
    pub error: Option<GraphError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub code: i64,
}

/// OAuth error code the Graph API uses for expired/invalid tokens.
const AUTH_ERROR_CODE: i64 = 190;

/// Extract (message, is_auth_failure) from an error response body.
pub fn parse_error_body(status: reqwest::StatusCode, body: &str) -> (String, bool) {
    match serde_json::from_str::<GraphErrorBody>(body) {
        Ok(GraphErrorBody { error: Some(e) }) => {
            let auth = e.code == AUTH_ERROR_CODE
                || e.kind == "OAuthException"
                || status == reqwest::StatusCode::UNAUTHORIZED;
            let message = if e.message.is_empty() {
                format!("provider returned {status}")
            } else {
                e.message
            };
            (message, auth)
        }
        _ => (
            format!("provider returned {status}"),
            status == reqwest::StatusCode::UNAUTHORIZED,
        ),
    }
}

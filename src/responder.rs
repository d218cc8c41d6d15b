//! Reply generation — persona selection, LLM call, degrade-to-fallback.
//!
//! The responder never fails: collaborator errors and empty completions
//! take the named fallback branch so the conversation always receives a
//! bot turn and the pipeline proceeds to delivery and logging.

use mbote_core::{
    context::{CompletionRequest, ConversationContext},
    intent::Intent,
    sanitize::{strip_markup, truncate_for_transport},
    traits::Provider,
};
use std::sync::Arc;
use tracing::warn;

/// Generates replies for classified inbound messages.
pub struct Responder {
    provider: Arc<dyn Provider>,
    fallback_reply: String,
}

impl Responder {
    pub fn new(provider: Arc<dyn Provider>, fallback_reply: String) -> Self {
        Self {
            provider,
            fallback_reply,
        }
    }

    /// Produce a reply for the message. Infallible by contract.
    pub async fn respond(
        &self,
        intent: Intent,
        message: &str,
        context: &ConversationContext,
    ) -> String {
        let system_prompt = build_system_prompt(intent, context);
        let request = CompletionRequest::new(&system_prompt, message);

        let reply = match self.provider.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("empty completion from {}, using fallback", self.provider.name());
                self.fallback_reply.clone()
            }
            Err(e) => {
                warn!("provider {} failed, using fallback: {e}", self.provider.name());
                self.fallback_reply.clone()
            }
        };

        // The delivery channel sanitizes again; stripping here keeps bad
        // completions out of the stored conversation log too.
        let reply = strip_markup(&reply);
        truncate_for_transport(reply.trim())
    }
}

/// Select and fill the persona template for an intent.
fn build_system_prompt(intent: Intent, context: &ConversationContext) -> String {
    let channel = if context.channel.is_empty() {
        "whatsapp"
    } else {
        &context.channel
    };

    match intent {
        Intent::Client => format!(
            "Tu es l'assistant du service client d'une plateforme \u{e9}ducative. \
             Tu r\u{e9}ponds via {channel} : messages courts, ton courtois et concret. \
             R\u{e9}ponds dans la langue de l'utilisateur. \
             Si la demande d\u{e9}passe tes capacit\u{e9}s, oriente vers l'\u{e9}quipe support."
        ),
        Intent::Education => {
            let level = context.education_level.as_deref().unwrap_or("debutant");
            let subject = context.subject.as_deref().unwrap_or("g\u{e9}n\u{e9}ral");
            let understanding = context.understanding.as_deref().unwrap_or("inconnue");
            let complexity = context.complexity.as_deref().unwrap_or("adapt\u{e9}e au niveau");
            format!(
                "Tu es un tuteur p\u{e9}dagogue qui enseigne via {channel}. \
                 Niveau de l'\u{e9}l\u{e8}ve : {level}. Mati\u{e8}re : {subject}. \
                 Compr\u{e9}hension pr\u{e9}alable : {understanding}. Complexit\u{e9} attendue : {complexity}. \
                 Explique pas \u{e0} pas, avec des exemples simples, et termine par une question \
                 pour v\u{e9}rifier la compr\u{e9}hension."
            )
        }
        Intent::Quiz => format!(
            "Tu es un animateur de quiz enthousiaste sur {channel}. \
             Pose une question \u{e0} la fois, attends la r\u{e9}ponse, puis corrige avec une \
             explication br\u{e8}ve. Adapte la difficult\u{e9} aux r\u{e9}ponses pr\u{e9}c\u{e9}dentes."
        ),
    }
}

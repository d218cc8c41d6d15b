//! Paced sequential batch sending with template substitution.

use super::WhatsAppChannel;
use mbote_core::{
    message::{MessageResult, OutboundRequest, WhatsAppConfig},
    phone,
    traits::DeliveryChannel,
};
use std::collections::HashMap;
use tracing::warn;

/// Replace `{{name}}` placeholders from the variable map. Placeholders
/// without a matching variable are left verbatim.
pub fn substitute_vars(template: &str, vars: Option<&HashMap<String, String>>) -> String {
    let Some(vars) = vars else {
        return template.to_string();
    };
    let mut out = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{key}}}}}");
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, value);
        }
    }
    out
}

impl WhatsAppChannel {
    /// Send a batch sequentially. Every input item yields exactly one
    /// result: invalid numbers and per-message failures are recorded,
    /// never fatal to the rest of the batch.
    ///
    /// Pacing waits `pacing × position` before each send to respect the
    /// provider's rate limits.
    pub(super) async fn send_batch(
        &self,
        batch: &[OutboundRequest],
        config: &WhatsAppConfig,
    ) -> Vec<MessageResult> {
        let mut results = Vec::with_capacity(batch.len());

        for (position, request) in batch.iter().enumerate() {
            let to = phone::normalize(&request.to, self.default_country_prefix());
            if !phone::is_valid(&to) {
                warn!("dropping invalid phone number {:?} from batch", request.to);
                results.push(MessageResult::err(&request.to, "invalid phone number"));
                continue;
            }

            let message = substitute_vars(&request.message, request.variables.as_ref());

            let delay = self.pacing() * position as u32;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let result = match self.send(&to, &message, request.media.as_ref(), config).await {
                Ok(record) => MessageResult::ok(&to, record.provider_message_id),
                Err(e) => MessageResult::err(&to, e.to_string()),
            };
            results.push(result);
        }

        results
    }
}

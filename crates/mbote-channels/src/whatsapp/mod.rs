//! WhatsApp channel — Business Cloud API over HTTPS.
//!
//! Sends go to the Graph API send-message endpoint with bearer auth. A
//! delivery record is written for every attempt, success or failure,
//! before the result is returned to the caller.

mod batch;
mod payload;

pub use payload::{parse_error_body, SendPayload};

use async_trait::async_trait;
use mbote_core::{
    config::WhatsAppSettings,
    error::MboteError,
    message::{DeliveryRecord, MediaRef, MessageResult, OutboundRequest, WhatsAppConfig},
    sanitize,
    traits::{DeliveryChannel, RecordStore},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// WhatsApp Business Cloud API channel.
pub struct WhatsAppChannel {
    http: reqwest::Client,
    api_base_url: String,
    store: Arc<dyn RecordStore>,
    probe_timeout: Duration,
    send_timeout: Duration,
    pacing: Duration,
    default_country_prefix: String,
}

impl WhatsAppChannel {
    /// Create a new channel from settings.
    pub fn new(
        settings: &WhatsAppSettings,
        default_country_prefix: &str,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, MboteError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| MboteError::delivery(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            store,
            probe_timeout: Duration::from_secs(settings.probe_timeout_secs),
            send_timeout: Duration::from_secs(settings.send_timeout_secs),
            pacing: Duration::from_millis(settings.pacing_ms),
            default_country_prefix: default_country_prefix.to_string(),
        })
    }

    pub(crate) fn pacing(&self) -> Duration {
        self.pacing
    }

    pub(crate) fn default_country_prefix(&self) -> &str {
        &self.default_country_prefix
    }

    /// Validate a media URL and probe its reachability.
    async fn check_media(&self, media: &MediaRef) -> Result<(), MboteError> {
        let url = reqwest::Url::parse(&media.url)
            .map_err(|e| MboteError::InvalidMediaUrl(format!("{}: {e}", media.url)))?;

        let resp = self
            .http
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| MboteError::MediaUnreachable(format!("{}: {e}", media.url)))?;

        if !resp.status().is_success() {
            return Err(MboteError::MediaUnreachable(format!(
                "{}: HEAD returned {}",
                media.url,
                resp.status()
            )));
        }
        Ok(())
    }

    /// The remote call itself: sanitize, build payload, POST, extract the
    /// provider message id. Record persistence happens in `send`.
    async fn try_send(
        &self,
        to: &str,
        message: &str,
        media: Option<&MediaRef>,
        config: &WhatsAppConfig,
    ) -> Result<(String, String), MboteError> {
        let clean = sanitize::sanitize(message)?;

        let payload = match media {
            Some(m) => {
                self.check_media(m).await?;
                SendPayload::media(to, m.kind, &m.url, &clean)
            }
            None => SendPayload::text(to, &clean),
        };

        let url = format!("{}/{}/messages", self.api_base_url, config.phone_number_id);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&config.access_token)
            .timeout(self.send_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MboteError::delivery(format!("send request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let (message, auth_failure) = parse_error_body(status, &body);
            return Err(MboteError::Delivery {
                message,
                auth_failure,
            });
        }

        let parsed: payload::SendResponse = resp
            .json()
            .await
            .map_err(|e| MboteError::delivery(format!("bad send response: {e}")))?;

        let provider_id = parsed
            .messages
            .first()
            .map(|m| m.id.clone())
            .ok_or_else(|| MboteError::delivery("no message id in send response"))?;

        Ok((provider_id, clean))
    }

    /// Best-effort record write — a store hiccup must not mask the send
    /// outcome.
    async fn persist_record(&self, record: &DeliveryRecord) {
        if let Err(e) = self.store.insert_delivery(record).await {
            error!("failed to persist delivery record {}: {e}", record.id);
        }
    }
}

#[async_trait]
impl DeliveryChannel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(
        &self,
        to: &str,
        message: &str,
        media: Option<&MediaRef>,
        config: &WhatsAppConfig,
    ) -> Result<DeliveryRecord, MboteError> {
        match self.try_send(to, message, media, config).await {
            Ok((provider_id, clean)) => {
                let record = DeliveryRecord::sent(to, &clean, &provider_id);
                self.persist_record(&record).await;
                info!("whatsapp sent to {to} ({provider_id})");
                Ok(record)
            }
            Err(e) => {
                if let MboteError::Delivery {
                    auth_failure: true, ..
                } = &e
                {
                    // Expired token: disable the row so future sends fail
                    // fast with a configuration error instead of repeating
                    // the remote failure.
                    warn!("whatsapp auth failure, deactivating config {}", config.id);
                    if let Err(de) = self.store.deactivate_config(&config.id).await {
                        error!("failed to deactivate config {}: {de}", config.id);
                    }
                }
                let record = DeliveryRecord::errored(to, message, &e.to_string());
                self.persist_record(&record).await;
                Err(e)
            }
        }
    }

    async fn send_many(
        &self,
        batch: &[OutboundRequest],
        config: &WhatsAppConfig,
    ) -> Vec<MessageResult> {
        self.send_batch(batch, config).await
    }
}

#[cfg(test)]
mod tests;

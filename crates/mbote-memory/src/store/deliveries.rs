//! Delivery records and their status lifecycle.

use super::{parse_ts, Store};
use chrono::Utc;
use mbote_core::{
    error::MboteError,
    message::{DeliveryRecord, DeliveryStatus},
};
use tracing::warn;

impl Store {
    pub(super) async fn insert_delivery_row(
        &self,
        record: &DeliveryRecord,
    ) -> Result<(), MboteError> {
        sqlx::query(
            "INSERT INTO delivery_records \
             (id, phone_number, message_preview, provider_message_id, status, error, \
              created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.phone_number)
        .bind(&record.message_preview)
        .bind(&record.provider_message_id)
        .bind(record.status.as_str())
        .bind(&record.error)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("delivery insert failed: {e}")))?;

        Ok(())
    }

    pub(super) async fn fetch_delivery(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<DeliveryRecord>, MboteError> {
        type Row = (
            String,
            String,
            String,
            Option<String>,
            String,
            Option<String>,
            String,
            String,
        );

        let row: Option<Row> = sqlx::query_as(
            "SELECT id, phone_number, message_preview, provider_message_id, status, error, \
                    created_at, updated_at \
             FROM delivery_records WHERE provider_message_id = ? \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(provider_message_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("delivery select failed: {e}")))?;

        row.map(
            |(id, phone_number, message_preview, provider_message_id, status, error, created_at, updated_at)| {
                let status = DeliveryStatus::parse(&status)
                    .ok_or_else(|| MboteError::Store(format!("bad delivery status {status:?}")))?;
                Ok(DeliveryRecord {
                    id,
                    phone_number,
                    message_preview,
                    provider_message_id,
                    status,
                    error,
                    created_at: parse_ts(&created_at)?,
                    updated_at: parse_ts(&updated_at)?,
                })
            },
        )
        .transpose()
    }

    /// Apply a lifecycle transition. Missing records and illegal
    /// transitions are warn-logged no-ops, not errors.
    pub(super) async fn apply_delivery_transition(
        &self,
        provider_message_id: &str,
        next: DeliveryStatus,
    ) -> Result<bool, MboteError> {
        let Some(record) = self.fetch_delivery(provider_message_id).await? else {
            warn!("status update for unknown provider message id {provider_message_id}");
            return Ok(false);
        };

        if !record.status.can_transition(next) {
            warn!(
                "illegal delivery transition {} -> {} for {provider_message_id}",
                record.status.as_str(),
                next.as_str()
            );
            return Ok(false);
        }

        sqlx::query("UPDATE delivery_records SET status = ?, updated_at = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(&record.id)
            .execute(self.pool())
            .await
            .map_err(|e| MboteError::Store(format!("delivery update failed: {e}")))?;

        Ok(true)
    }
}

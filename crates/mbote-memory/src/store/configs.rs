//! WhatsApp credential rows: precedence resolution and seeding.

use super::{parse_ts, Store};
use chrono::Utc;
use mbote_core::{
    config::WhatsAppSettings,
    error::MboteError,
    message::WhatsAppConfig,
};
use tracing::info;
use uuid::Uuid;

type ConfigRow = (
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    i64,
    String,
);

fn row_to_config(row: ConfigRow) -> Result<WhatsAppConfig, MboteError> {
    let (id, user_id, access_token, phone_number_id, business_account_id, active, updated_at) = row;
    Ok(WhatsAppConfig {
        id,
        user_id,
        access_token,
        phone_number_id,
        business_account_id,
        active: active != 0,
        updated_at: parse_ts(&updated_at)?,
    })
}

const CONFIG_COLUMNS: &str =
    "id, user_id, access_token, phone_number_id, business_account_id, active, updated_at";

impl Store {
    /// Resolve credentials: the active row scoped to `user_id` when
    /// given, else the most recently updated active row from any user.
    pub(super) async fn resolve_config_row(
        &self,
        user_id: Option<&str>,
    ) -> Result<WhatsAppConfig, MboteError> {
        if let Some(uid) = user_id {
            let row: Option<ConfigRow> = sqlx::query_as(&format!(
                "SELECT {CONFIG_COLUMNS} FROM whatsapp_configs \
                 WHERE user_id = ? AND active = 1 \
                 ORDER BY updated_at DESC LIMIT 1"
            ))
            .bind(uid)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| MboteError::Store(format!("config select failed: {e}")))?;

            if let Some(row) = row {
                return row_to_config(row);
            }
        }

        let row: Option<ConfigRow> = sqlx::query_as(&format!(
            "SELECT {CONFIG_COLUMNS} FROM whatsapp_configs \
             WHERE active = 1 \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .fetch_optional(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("config select failed: {e}")))?;

        match row {
            Some(row) => row_to_config(row),
            None => Err(MboteError::NoActiveConfig),
        }
    }

    pub(super) async fn deactivate_config_row(&self, config_id: &str) -> Result<(), MboteError> {
        sqlx::query("UPDATE whatsapp_configs SET active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(config_id)
            .execute(self.pool())
            .await
            .map_err(|e| MboteError::Store(format!("config deactivate failed: {e}")))?;
        Ok(())
    }

    /// Seed the credential table from file configuration when no active
    /// row exists for that phone number id. Rotated dashboard rows win
    /// over the file afterwards.
    pub async fn seed_config(&self, settings: &WhatsAppSettings) -> Result<(), MboteError> {
        if settings.access_token.is_empty() || settings.phone_number_id.is_empty() {
            return Ok(());
        }

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM whatsapp_configs \
             WHERE phone_number_id = ? AND active = 1 LIMIT 1",
        )
        .bind(&settings.phone_number_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("config seed check failed: {e}")))?;

        if existing.is_some() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO whatsapp_configs \
             (id, user_id, access_token, phone_number_id, business_account_id, active, updated_at) \
             VALUES (?, NULL, ?, ?, ?, 1, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&settings.access_token)
        .bind(&settings.phone_number_id)
        .bind(&settings.business_account_id)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("config seed failed: {e}")))?;

        info!(
            "seeded WhatsApp credentials for phone number id {}",
            settings.phone_number_id
        );
        Ok(())
    }
}

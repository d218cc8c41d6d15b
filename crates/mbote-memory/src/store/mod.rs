//! SQLite-backed record store.
//!
//! Split into focused submodules:
//! - `messages` — append-only conversation log
//! - `profiles` — learner profile upsert and lookup
//! - `deliveries` — delivery records and status transitions
//! - `configs` — WhatsApp credential resolution and seeding

mod configs;
mod deliveries;
mod messages;
mod profiles;

use chrono::{DateTime, Utc};
use mbote_core::{config::MemoryConfig, error::MboteError, shellexpand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Persistent record store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the store at the configured path, running migrations.
    pub async fn new(config: &MemoryConfig) -> Result<Self, MboteError> {
        let db_path = shellexpand(&config.db_path);

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MboteError::Store(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| MboteError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| MboteError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("record store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Open an in-memory store. Used by tests.
    pub async fn open_in_memory() -> Result<Self, MboteError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| MboteError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| MboteError::Store(format!("failed to open in-memory sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), MboteError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| MboteError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        MboteError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| MboteError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    MboteError::Store(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl mbote_core::traits::RecordStore for Store {
    async fn append_message(
        &self,
        message: &mbote_core::message::ConversationMessage,
    ) -> Result<(), MboteError> {
        self.insert_message(message).await
    }

    async fn recent_messages(
        &self,
        phone_number: &str,
        limit: i64,
    ) -> Result<Vec<mbote_core::message::ConversationMessage>, MboteError> {
        self.select_recent_messages(phone_number, limit).await
    }

    async fn upsert_profile(
        &self,
        phone_number: &str,
    ) -> Result<mbote_core::message::Profile, MboteError> {
        self.upsert_profile_row(phone_number).await
    }

    async fn insert_delivery(
        &self,
        record: &mbote_core::message::DeliveryRecord,
    ) -> Result<(), MboteError> {
        self.insert_delivery_row(record).await
    }

    async fn find_delivery(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<mbote_core::message::DeliveryRecord>, MboteError> {
        self.fetch_delivery(provider_message_id).await
    }

    async fn transition_delivery(
        &self,
        provider_message_id: &str,
        next: mbote_core::message::DeliveryStatus,
    ) -> Result<bool, MboteError> {
        self.apply_delivery_transition(provider_message_id, next).await
    }

    async fn resolve_config(
        &self,
        user_id: Option<&str>,
    ) -> Result<mbote_core::message::WhatsAppConfig, MboteError> {
        self.resolve_config_row(user_id).await
    }

    async fn deactivate_config(&self, config_id: &str) -> Result<(), MboteError> {
        self.deactivate_config_row(config_id).await
    }
}

/// Parse a stored RFC 3339 timestamp.
fn parse_ts(raw: &str) -> Result<DateTime<Utc>, MboteError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MboteError::Store(format!("bad timestamp {raw:?}: {e}")))
}

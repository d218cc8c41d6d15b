//! Learner profiles, created race-safely on first contact.

use super::{parse_ts, Store};
use chrono::Utc;
use mbote_core::{error::MboteError, message::Profile};

impl Store {
    /// Create-or-fetch the profile for a phone number.
    ///
    /// Uses a single ON CONFLICT upsert keyed on the phone number, so
    /// concurrent duplicate webhook deliveries resolve to one row.
    pub(super) async fn upsert_profile_row(
        &self,
        phone_number: &str,
    ) -> Result<Profile, MboteError> {
        let baseline = Profile::baseline(phone_number);

        sqlx::query(
            "INSERT INTO profiles \
             (phone_number, education_level, subjects, language, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (phone_number) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(phone_number)
        .bind(&baseline.education_level)
        .bind(serde_json::to_string(&baseline.subjects)?)
        .bind(&baseline.language)
        .bind(baseline.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("profile upsert failed: {e}")))?;

        self.fetch_profile(phone_number).await?.ok_or_else(|| {
            MboteError::Store(format!("profile missing after upsert: {phone_number}"))
        })
    }

    pub(super) async fn fetch_profile(
        &self,
        phone_number: &str,
    ) -> Result<Option<Profile>, MboteError> {
        type Row = (String, String, String, String, String, String);

        let row: Option<Row> = sqlx::query_as(
            "SELECT phone_number, education_level, subjects, language, created_at, updated_at \
             FROM profiles WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("profile select failed: {e}")))?;

        row.map(
            |(phone_number, education_level, subjects, language, created_at, updated_at)| {
                Ok(Profile {
                    phone_number,
                    education_level,
                    subjects: serde_json::from_str(&subjects)?,
                    language,
                    created_at: parse_ts(&created_at)?,
                    updated_at: parse_ts(&updated_at)?,
                })
            },
        )
        .transpose()
    }
}

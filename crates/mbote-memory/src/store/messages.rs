//! Append-only conversation log.

use super::{parse_ts, Store};
use mbote_core::{
    error::MboteError,
    intent::Intent,
    message::{ConversationMessage, SenderRole},
};

impl Store {
    pub(super) async fn insert_message(
        &self,
        message: &ConversationMessage,
    ) -> Result<(), MboteError> {
        sqlx::query(
            "INSERT INTO conversation_messages \
             (id, phone_number, content, sender, intent, response_time_seconds, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.phone_number)
        .bind(&message.content)
        .bind(message.sender.as_str())
        .bind(message.intent.map(|i| i.as_str()))
        .bind(message.response_time_seconds)
        .bind(message.created_at.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("message insert failed: {e}")))?;

        Ok(())
    }

    pub(super) async fn select_recent_messages(
        &self,
        phone_number: &str,
        limit: i64,
    ) -> Result<Vec<ConversationMessage>, MboteError> {
        type Row = (String, String, String, String, Option<String>, Option<f64>, String);

        let rows: Vec<Row> = sqlx::query_as(
            "SELECT id, phone_number, content, sender, intent, response_time_seconds, created_at \
             FROM conversation_messages \
             WHERE phone_number = ? \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?",
        )
        .bind(phone_number)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| MboteError::Store(format!("message select failed: {e}")))?;

        rows.into_iter()
            .map(|(id, phone_number, content, sender, intent, rt, created_at)| {
                let sender = SenderRole::parse(&sender)
                    .ok_or_else(|| MboteError::Store(format!("bad sender {sender:?}")))?;
                Ok(ConversationMessage {
                    id,
                    phone_number,
                    content,
                    sender,
                    intent: intent.as_deref().and_then(Intent::parse),
                    response_time_seconds: rt,
                    created_at: parse_ts(&created_at)?,
                })
            })
            .collect()
    }
}

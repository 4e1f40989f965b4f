//! Repository for two-party conversations.

use crate::entities::{normalise_pair, Conversation};
use crate::time::now_timestamp;
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

const CONVERSATION_COLUMNS: &str = "id, user_low, user_high, created_at, updated_at";

#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_conversation).transpose()
    }

    /// Look up the conversation for an unordered pair.
    pub async fn find_by_pair(&self, a: &str, b: &str) -> DatabaseResult<Option<Conversation>> {
        let (low, high) = normalise_pair(a, b);
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user_low = ? AND user_high = ?"
        ))
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_conversation).transpose()
    }

    /// Return the pair's conversation, creating it on first contact.
    ///
    /// The insert is a no-op when another writer won the race; the unique
    /// constraint on the normalised pair guarantees the re-read sees exactly
    /// one row.
    pub async fn find_or_create(&self, a: &str, b: &str) -> DatabaseResult<Conversation> {
        let (low, high) = normalise_pair(a, b);
        let id = cuid2::cuid();
        let now = now_timestamp();

        let result = sqlx::query(
            "INSERT INTO conversations (id, user_low, user_high, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (user_low, user_high) DO NOTHING",
        )
        .bind(&id)
        .bind(low)
        .bind(high)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(conversation_id = %id, user_low = %low, user_high = %high, "created conversation");
        }

        self.find_by_pair(low, high)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("conversation {low}/{high}")))
    }

    /// Every conversation the user participates in, most recently updated first.
    pub async fn list_for_user(&self, user_id: &str) -> DatabaseResult<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE user_low = ? OR user_high = ?
             ORDER BY updated_at DESC, created_at DESC"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_conversation).collect()
    }
}

fn map_conversation(row: &SqliteRow) -> DatabaseResult<Conversation> {
    Ok(Conversation {
        id: row.try_get("id")?,
        user_low: row.try_get("user_low")?,
        user_high: row.try_get("user_high")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

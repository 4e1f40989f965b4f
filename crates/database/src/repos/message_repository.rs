//! Repository for messages across conversations, groups and the broadcast log.

use crate::entities::{MessageContainer, MessageRecord, NewMessage};
use crate::time::now_timestamp;
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, group_id, is_broadcast, author_id, text, image_url, video_url, seen, created_at";

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message and bump the container's `updated_at` in one transaction.
    pub async fn append(
        &self,
        container: &MessageContainer,
        message: &NewMessage,
    ) -> DatabaseResult<MessageRecord> {
        let id = cuid2::cuid();
        let now = now_timestamp();

        let (conversation_id, group_id, is_broadcast) = match container {
            MessageContainer::Conversation(id) => (Some(id.as_str()), None, false),
            MessageContainer::Group(id) => (None, Some(id.as_str()), false),
            MessageContainer::Broadcast => (None, None, true),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO messages
                (id, conversation_id, group_id, is_broadcast, author_id, text, image_url, video_url, seen, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(group_id)
        .bind(is_broadcast)
        .bind(&message.author_id)
        .bind(&message.text)
        .bind(&message.image_url)
        .bind(&message.video_url)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let touched = match container {
            MessageContainer::Conversation(id) => Some(("conversations", id)),
            MessageContainer::Group(id) => Some(("chat_groups", id)),
            MessageContainer::Broadcast => None,
        };
        if let Some((table, container_id)) = touched {
            sqlx::query(&format!("UPDATE {table} SET updated_at = ? WHERE id = ?"))
                .bind(&now)
                .bind(container_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(message_id = %id, author_id = %message.author_id, ?container, "appended message");

        Ok(MessageRecord {
            id,
            container: container.clone(),
            author_id: message.author_id.clone(),
            text: message.text.clone(),
            image_url: message.image_url.clone(),
            video_url: message.video_url.clone(),
            seen: false,
            created_at: now,
        })
    }

    /// Full history of a container in creation order.
    pub async fn list(&self, container: &MessageContainer) -> DatabaseResult<Vec<MessageRecord>> {
        let (filter, key) = container_filter(container);
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE {filter} ORDER BY created_at ASC, seq ASC"
        );

        let mut query = sqlx::query(&sql);
        if let Some(key) = key {
            query = query.bind(key);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(map_message).collect()
    }

    pub async fn latest(&self, container: &MessageContainer) -> DatabaseResult<Option<MessageRecord>> {
        let (filter, key) = container_filter(container);
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE {filter} ORDER BY created_at DESC, seq DESC LIMIT 1"
        );

        let mut query = sqlx::query(&sql);
        if let Some(key) = key {
            query = query.bind(key);
        }
        let row = query.fetch_optional(&self.pool).await?;

        row.as_ref().map(map_message).transpose()
    }

    /// Unseen messages in a conversation written by `author_id`.
    pub async fn count_unseen(&self, conversation_id: &str, author_id: &str) -> DatabaseResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS unseen FROM messages
             WHERE conversation_id = ? AND author_id = ? AND seen = 0",
        )
        .bind(conversation_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("unseen")?)
    }

    /// Flag every unseen message from `author_id` in the conversation as seen.
    /// Returns the number of rows that changed.
    pub async fn mark_seen(&self, conversation_id: &str, author_id: &str) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET seen = 1
             WHERE conversation_id = ? AND author_id = ? AND seen = 0",
        )
        .bind(conversation_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn container_filter(container: &MessageContainer) -> (&'static str, Option<&str>) {
    match container {
        MessageContainer::Conversation(id) => ("conversation_id = ?", Some(id.as_str())),
        MessageContainer::Group(id) => ("group_id = ?", Some(id.as_str())),
        MessageContainer::Broadcast => ("is_broadcast = 1", None),
    }
}

fn map_message(row: &SqliteRow) -> DatabaseResult<MessageRecord> {
    let id: String = row.try_get("id")?;
    let conversation_id: Option<String> = row.try_get("conversation_id")?;
    let group_id: Option<String> = row.try_get("group_id")?;
    let is_broadcast: bool = row.try_get("is_broadcast")?;

    let container = match (conversation_id, group_id, is_broadcast) {
        (Some(conversation), None, false) => MessageContainer::Conversation(conversation),
        (None, Some(group), false) => MessageContainer::Group(group),
        (None, None, true) => MessageContainer::Broadcast,
        _ => return Err(DatabaseError::corrupt(format!("message {id} has no single container"))),
    };

    Ok(MessageRecord {
        id,
        container,
        author_id: row.try_get("author_id")?,
        text: row.try_get("text")?,
        image_url: row.try_get("image_url")?,
        video_url: row.try_get("video_url")?,
        seen: row.try_get("seen")?,
        created_at: row.try_get("created_at")?,
    })
}

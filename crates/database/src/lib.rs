//! Parley Database Crate
//!
//! SQLite storage for users, conversations, groups, and the message logs
//! (direct threads, group threads and the single broadcast log).

use parley_config::DatabaseConfig;
use sqlx::{Row, SqlitePool};

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod time;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{ConversationRepository, GroupRepository, MessageRepository, UserRepository};

pub use entities::{
    normalise_pair, Conversation, GroupRecord, MessageContainer, MessageRecord, NewGroup,
    NewMessage, NewUser, UserRecord,
};

pub use types::{errors::DatabaseError, DatabaseResult};

pub use sqlx::SqlitePool as Pool;

const COUNTED_TABLES: &[&str] = &["users", "conversations", "chat_groups", "group_members", "messages"];

/// Open the pool and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

/// Row count per table, in schema order.
pub async fn table_counts(pool: &SqlitePool) -> DatabaseResult<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(COUNTED_TABLES.len());
    for table in COUNTED_TABLES {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM {table}"))
            .fetch_one(pool)
            .await?;
        counts.push((*table, row.try_get("total")?));
    }
    Ok(counts)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub async fn test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir");
        let db_path = temp_dir.path().join("test.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 4,
            busy_timeout_ms: 5_000,
        };

        let pool = initialize_database(&config).await.expect("test database");
        (pool, temp_dir)
    }
}

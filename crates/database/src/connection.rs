//! Database connection management

use anyhow::{Context, Result};
use parley_config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Open a pool with foreign keys, WAL and a busy timeout applied to every connection.
pub async fn prepare_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    ensure_sqlite_parent(&config.url).await?;

    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("invalid sqlite url {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database {}", config.url))?;

    info!(url = %config.url, "database connection established");
    Ok(pool)
}

/// Create the directory holding an on-disk SQLite file.
async fn ensure_sqlite_parent(url: &str) -> Result<()> {
    let Some(rest) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };

    let sqlite_path = rest.split('?').next().unwrap_or_default();
    if sqlite_path.is_empty() || sqlite_path.contains(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(sqlite_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create sqlite directory {}", parent.display())
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(url: String) -> DatabaseConfig {
        DatabaseConfig {
            url,
            max_connections: 2,
            busy_timeout_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn creates_missing_directories_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/dir/parley.db");

        let pool = prepare_database(&config(format!("sqlite://{}", db_path.display())))
            .await
            .unwrap();

        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced_on_every_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("fk.db");
        let pool = prepare_database(&config(format!("sqlite:{}", db_path.display())))
            .await
            .unwrap();

        let mut first = pool.acquire().await.unwrap();
        let mut second = pool.acquire().await.unwrap();
        for conn in [&mut first, &mut second] {
            let (enabled,): (bool,) = sqlx::query_as("PRAGMA foreign_keys")
                .fetch_one(&mut **conn)
                .await
                .unwrap();
            assert!(enabled);
        }
    }

    #[tokio::test]
    async fn in_memory_database_is_accepted() {
        let pool = prepare_database(&config("sqlite::memory:".to_string()))
            .await
            .unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
    }
}

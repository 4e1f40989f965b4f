//! Repository for user lookups.

use crate::entities::{NewUser, UserRecord};
use crate::time::now_timestamp;
use crate::types::DatabaseResult;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

const USER_COLUMNS: &str = "id, display_name, email, avatar_url, is_admin, created_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Provision a user row. Used by tooling and tests; regular users arrive
    /// from the identity provider.
    pub async fn insert(&self, request: &NewUser) -> DatabaseResult<UserRecord> {
        let id = request
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(cuid2::cuid);
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO users (id, display_name, email, avatar_url, is_admin, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.display_name)
        .bind(&request.email)
        .bind(&request.avatar_url)
        .bind(request.is_admin)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(user_id = %id, is_admin = request.is_admin, "created user");

        Ok(UserRecord {
            id,
            display_name: request.display_name.clone(),
            email: request.email.clone(),
            avatar_url: request.avatar_url.clone(),
            is_admin: request.is_admin,
            created_at: now,
        })
    }

    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Resolve a batch of ids. Unknown ids are skipped; order follows the input.
    pub async fn find_many(&self, ids: &[String]) -> DatabaseResult<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut users = rows.iter().map(map_user).collect::<DatabaseResult<Vec<_>>>()?;
        users.sort_by_key(|user| ids.iter().position(|id| id == &user.id));
        Ok(users)
    }

    /// Every user except `id`, ordered by display name.
    pub async fn list_except(&self, id: &str) -> DatabaseResult<Vec<UserRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id != ? ORDER BY display_name COLLATE NOCASE, id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_user).collect()
    }
}

pub(crate) fn map_user(row: &SqliteRow) -> DatabaseResult<UserRecord> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        display_name: row.try_get("display_name")?,
        email: row.try_get("email")?,
        avatar_url: row.try_get("avatar_url")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

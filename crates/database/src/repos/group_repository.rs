//! Repository for groups and their membership.

use crate::entities::{GroupRecord, NewGroup};
use crate::time::now_timestamp;
use crate::types::DatabaseResult;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

#[derive(Clone)]
pub struct GroupRepository {
    pool: SqlitePool,
}

impl GroupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a group with the creator as first member and sole admin.
    pub async fn create(&self, request: &NewGroup) -> DatabaseResult<GroupRecord> {
        let id = cuid2::cuid();
        let now = now_timestamp();

        let mut members = vec![request.created_by.clone()];
        for member in &request.member_ids {
            if !members.contains(member) {
                members.push(member.clone());
            }
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO chat_groups (id, name, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for member in &members {
            sqlx::query(
                "INSERT INTO group_members (group_id, user_id, is_admin, joined_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(member)
            .bind(member == &request.created_by)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            group_id = %id,
            created_by = %request.created_by,
            member_count = members.len(),
            "created group"
        );

        Ok(GroupRecord {
            id,
            name: request.name.clone(),
            created_by: request.created_by.clone(),
            created_at: now.clone(),
            updated_at: now,
            members,
            admins: vec![request.created_by.clone()],
        })
    }

    pub async fn find_by_id(&self, group_id: &str) -> DatabaseResult<Option<GroupRecord>> {
        let row = sqlx::query(
            "SELECT id, name, created_by, created_at, updated_at FROM chat_groups WHERE id = ?",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Groups the user belongs to, most recently active first.
    pub async fn list_for_member(&self, user_id: &str) -> DatabaseResult<Vec<GroupRecord>> {
        let rows = sqlx::query(
            "SELECT g.id, g.name, g.created_by, g.created_at, g.updated_at
             FROM chat_groups g
             JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = ?
             ORDER BY g.updated_at DESC, g.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            groups.push(self.hydrate(row).await?);
        }
        Ok(groups)
    }

    pub async fn group_ids_for_member(&self, user_id: &str) -> DatabaseResult<Vec<String>> {
        let rows = sqlx::query("SELECT group_id FROM group_members WHERE user_id = ? ORDER BY rowid")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("group_id").map_err(Into::into))
            .collect()
    }

    pub async fn is_member(&self, group_id: &str, user_id: &str) -> DatabaseResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = ? AND user_id = ?) AS present",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("present")?)
    }

    async fn hydrate(&self, row: &SqliteRow) -> DatabaseResult<GroupRecord> {
        let id: String = row.try_get("id")?;

        let member_rows = sqlx::query(
            "SELECT user_id, is_admin FROM group_members WHERE group_id = ? ORDER BY rowid",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(member_rows.len());
        let mut admins = Vec::new();
        for member in &member_rows {
            let user_id: String = member.try_get("user_id")?;
            let is_admin: bool = member.try_get("is_admin")?;
            if is_admin {
                admins.push(user_id.clone());
            }
            members.push(user_id);
        }

        Ok(GroupRecord {
            id,
            name: row.try_get("name")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            members,
            admins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::NewUser;
    use crate::repos::UserRepository;
    use crate::test_support::test_pool;

    #[tokio::test]
    async fn create_adds_creator_as_member_and_sole_admin() {
        let (pool, _dir) = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let a = users.insert(&NewUser::named("a")).await.unwrap().id;
        let b = users.insert(&NewUser::named("b")).await.unwrap().id;
        let repo = GroupRepository::new(pool);

        let group = repo
            .create(&NewGroup {
                name: "crew".into(),
                created_by: a.clone(),
                member_ids: vec![b.clone(), a.clone(), b.clone()],
            })
            .await
            .unwrap();

        assert_eq!(group.members, vec![a.clone(), b.clone()]);
        assert_eq!(group.admins, vec![a.clone()]);

        let stored = repo.find_by_id(&group.id).await.unwrap().unwrap();
        assert_eq!(stored, group);
        assert!(repo.is_member(&group.id, &b).await.unwrap());
        assert!(!repo.is_member(&group.id, "stranger").await.unwrap());
    }

    #[tokio::test]
    async fn create_with_unknown_member_rolls_back() {
        let (pool, _dir) = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let a = users.insert(&NewUser::named("a")).await.unwrap().id;
        let repo = GroupRepository::new(pool);

        let result = repo
            .create(&NewGroup {
                name: "ghosts".into(),
                created_by: a.clone(),
                member_ids: vec!["ghost".into()],
            })
            .await;

        assert!(result.is_err());
        assert!(repo.list_for_member(&a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn membership_listing_only_returns_joined_groups() {
        let (pool, _dir) = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let a = users.insert(&NewUser::named("a")).await.unwrap().id;
        let b = users.insert(&NewUser::named("b")).await.unwrap().id;
        let repo = GroupRepository::new(pool);

        let shared = repo
            .create(&NewGroup {
                name: "shared".into(),
                created_by: a.clone(),
                member_ids: vec![b.clone()],
            })
            .await
            .unwrap();
        let solo = repo
            .create(&NewGroup {
                name: "solo".into(),
                created_by: a.clone(),
                member_ids: vec![],
            })
            .await
            .unwrap();

        assert_eq!(
            repo.group_ids_for_member(&a).await.unwrap(),
            vec![shared.id.clone(), solo.id.clone()]
        );
        let for_b = repo.list_for_member(&b).await.unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].id, shared.id);
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }
}

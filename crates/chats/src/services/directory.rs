//! Read-only user directory.

use parley_auth::UserIdentity;
use parley_database::{Pool, UserRecord, UserRepository};

use crate::types::{ChatError, ChatResult, UserView};
use crate::utils::Validator;

#[derive(Clone)]
pub struct UserDirectory {
    users: UserRepository,
}

impl UserDirectory {
    pub fn new(pool: Pool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    pub async fn find(&self, user_id: &str) -> ChatResult<UserRecord> {
        let user_id = Validator::identifier("user_id", user_id)?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ChatError::not_found("user", user_id))
    }

    /// Everyone except the viewer, for picking group members.
    pub async fn list_others(&self, viewer: &UserIdentity) -> ChatResult<Vec<UserView>> {
        Ok(self
            .users
            .list_except(&viewer.id)
            .await?
            .into_iter()
            .map(UserView::from)
            .collect())
    }
}

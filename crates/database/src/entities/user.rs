//! User entity definitions

use serde::{Deserialize, Serialize};

/// A user as provisioned by the identity provider. Read-only to the chat core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    /// Explicit id, or `None` to mint one.
    pub id: Option<String>,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
}

impl NewUser {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

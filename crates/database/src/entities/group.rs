//! Group entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub members: Vec<String>,
    pub admins: Vec<String>,
}

impl GroupRecord {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub created_by: String,
    /// Members besides the creator; duplicates and the creator are ignored.
    pub member_ids: Vec<String>,
}

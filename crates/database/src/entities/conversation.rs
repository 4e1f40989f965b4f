//! Conversation entity definitions

use serde::{Deserialize, Serialize};

/// A two-party thread. The pair is stored normalised so `user_low <= user_high`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_low: String,
    pub user_high: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn involves(&self, user_id: &str) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }

    /// The other participant, or `None` when `user_id` is not part of the pair.
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.user_low == user_id {
            Some(&self.user_high)
        } else if self.user_high == user_id {
            Some(&self.user_low)
        } else {
            None
        }
    }
}

pub fn normalise_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

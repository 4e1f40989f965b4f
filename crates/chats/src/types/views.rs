//! Client-facing projections of stored entities.

use parley_auth::UserIdentity;
use parley_database::{GroupRecord, MessageRecord, UserRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.display_name,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}

impl From<&UserIdentity> for UserView {
    fn from(user: &UserIdentity) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// A user as seen from the other side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerView {
    #[serde(flatten)]
    pub user: UserView,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub author_id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub seen: bool,
    pub created_at: String,
}

impl From<MessageRecord> for MessageView {
    fn from(message: MessageRecord) -> Self {
        Self {
            id: message.id,
            author_id: message.author_id,
            text: message.text,
            image_url: message.image_url,
            video_url: message.video_url,
            seen: message.seen,
            created_at: message.created_at,
        }
    }
}

/// A message with its author's identity resolved. `author` is `None` only
/// when the author row no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredMessage {
    #[serde(flatten)]
    pub message: MessageView,
    pub author: Option<UserView>,
}

/// Message payload as submitted by a client. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub members: Vec<UserView>,
    pub admins: Vec<UserView>,
    pub created_at: String,
    pub updated_at: String,
}

impl GroupView {
    /// Build a view, resolving member ids against `users`. Ids with no
    /// matching user are dropped.
    pub fn resolve(group: GroupRecord, users: &[UserView]) -> Self {
        let lookup = |ids: &[String]| -> Vec<UserView> {
            ids.iter()
                .filter_map(|id| users.iter().find(|user| &user.id == id).cloned())
                .collect()
        };

        Self {
            members: lookup(&group.members),
            admins: lookup(&group.admins),
            id: group.id,
            name: group.name,
            created_by: group.created_by,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: GroupView,
    pub messages: Vec<AuthoredMessage>,
}

/// A group message as fanned out to the group topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessage {
    pub group_id: String,
    pub message: AuthoredMessage,
}

/// Full contents of a direct thread after a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectThread {
    pub conversation_id: String,
    pub participants: Vec<String>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub counterpart: PeerView,
    pub conversation_id: Option<String>,
    pub messages: Vec<MessageView>,
}

/// Result of a mark-seen pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenUpdate {
    pub conversation_id: Option<String>,
    pub participants: Vec<String>,
    pub updated: u64,
}

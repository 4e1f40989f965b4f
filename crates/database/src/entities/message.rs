//! Message entity definitions

use serde::{Deserialize, Serialize};

/// Where a message lives. Every message belongs to exactly one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MessageContainer {
    Conversation(String),
    Group(String),
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub container: MessageContainer,
    pub author_id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub seen: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub author_id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

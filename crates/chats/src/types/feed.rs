//! Sidebar feed items and their ranking.

use chrono::{DateTime, Utc};
use parley_database::time::parse_timestamp;
use serde::{Deserialize, Serialize};

use super::views::{AuthoredMessage, MessageView, PeerView, UserView};

pub const BROADCAST_TITLE: &str = "Broadcast Messages";

/// One row of a user's sidebar. The variant is fixed when the item is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedItem {
    Direct(DirectEntry),
    Group(GroupEntry),
    Broadcast(BroadcastEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectEntry {
    pub conversation_id: String,
    pub counterpart: PeerView,
    pub last_message: Option<MessageView>,
    pub unseen_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub group_id: String,
    pub name: String,
    pub member_count: usize,
    pub last_message: Option<AuthoredMessage>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEntry {
    pub title: String,
    pub author: Option<UserView>,
    pub last_message: MessageView,
}

impl BroadcastEntry {
    pub fn new(latest: AuthoredMessage) -> Self {
        Self {
            title: BROADCAST_TITLE.to_string(),
            author: latest.author,
            last_message: latest.message,
        }
    }
}

impl FeedItem {
    /// Last message time, else last update, else creation, else the earliest
    /// representable instant.
    pub fn effective_timestamp(&self) -> DateTime<Utc> {
        let candidates: [Option<&str>; 3] = match self {
            FeedItem::Direct(entry) => [
                entry.last_message.as_ref().map(|m| m.created_at.as_str()),
                Some(entry.updated_at.as_str()),
                Some(entry.created_at.as_str()),
            ],
            FeedItem::Group(entry) => [
                entry
                    .last_message
                    .as_ref()
                    .map(|m| m.message.created_at.as_str()),
                Some(entry.updated_at.as_str()),
                Some(entry.created_at.as_str()),
            ],
            FeedItem::Broadcast(entry) => [Some(entry.last_message.created_at.as_str()), None, None],
        };

        candidates
            .into_iter()
            .flatten()
            .find_map(parse_timestamp)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Order items newest first. Ties keep their incoming order.
pub fn rank_feed(mut items: Vec<FeedItem>) -> Vec<FeedItem> {
    items.sort_by_key(|item| std::cmp::Reverse(item.effective_timestamp()));
    items
}

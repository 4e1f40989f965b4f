//! Shared types for the chat system.

pub mod errors;
pub mod feed;
pub mod views;

pub use errors::{ChatError, ChatResult};
pub use feed::{rank_feed, BroadcastEntry, DirectEntry, FeedItem, GroupEntry, BROADCAST_TITLE};
pub use views::{
    AuthoredMessage, ConversationContext, DirectThread, GroupDetail, GroupMessage, GroupView,
    MessageContent, MessageView, PeerView, SeenUpdate, UserView,
};

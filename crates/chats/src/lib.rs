//! # Parley Chats Crate
//!
//! Messaging pipelines and aggregation for Parley:
//!
//! - **Direct**: two-party threads created lazily on first message
//! - **Groups**: explicit membership, creator as sole initial admin
//! - **Broadcast**: one append-only log visible to every non-administrator
//! - **Seen state**: per-message flag flipped by the recipient
//! - **Feed**: per-user ranked merge of all of the above
//!
//! Services return data only; delivering it to connections is the
//! gateway's job.
//!
//! ```rust,ignore
//! use parley_chats::{ChatServices, MessageContent};
//!
//! let services = ChatServices::new(pool);
//! let thread = services.direct.submit(&alice, &bob.id, MessageContent::text("hi")).await?;
//! ```

pub mod services;
pub mod types;
pub mod utils;

pub use services::{
    BroadcastService, ChatServices, DirectMessageService, FeedService, GroupService, SeenService,
    UserDirectory,
};
pub use types::{
    rank_feed, AuthoredMessage, BroadcastEntry, ChatError, ChatResult, ConversationContext,
    DirectEntry, DirectThread, FeedItem, GroupDetail, GroupEntry, GroupMessage, GroupView,
    MessageContent, MessageView, PeerView, SeenUpdate, UserView,
};

//! Domain entities for the database layer

pub mod conversation;
pub mod group;
pub mod message;
pub mod user;

pub use conversation::{normalise_pair, Conversation};
pub use group::{GroupRecord, NewGroup};
pub use message::{MessageContainer, MessageRecord, NewMessage};
pub use user::{NewUser, UserRecord};

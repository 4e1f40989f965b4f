//! Database repository implementations

pub mod conversation_repository;
pub mod group_repository;
pub mod message_repository;
pub mod user_repository;

pub use conversation_repository::ConversationRepository;
pub use group_repository::GroupRepository;
pub use message_repository::MessageRepository;
pub use user_repository::UserRepository;

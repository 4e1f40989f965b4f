//! Broadcast pipeline over the single deployment-wide log.

use parley_auth::UserIdentity;
use parley_database::{MessageContainer, MessageRepository, Pool, UserRepository};
use tracing::info;

use super::authors::{new_message, with_author, with_authors};
use crate::types::{AuthoredMessage, ChatResult, MessageContent};
use crate::utils::Validator;

#[derive(Clone)]
pub struct BroadcastService {
    users: UserRepository,
    messages: MessageRepository,
}

impl BroadcastService {
    pub fn new(pool: Pool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }

    /// Append to the broadcast log and return the updated history.
    pub async fn post(
        &self,
        sender: &UserIdentity,
        content: MessageContent,
    ) -> ChatResult<Vec<AuthoredMessage>> {
        let content = Validator::message_content(content)?;

        let message = self
            .messages
            .append(&MessageContainer::Broadcast, &new_message(&sender.id, content))
            .await?;

        info!(message_id = %message.id, sender_id = %sender.id, "broadcast message stored");

        self.history().await
    }

    pub async fn history(&self) -> ChatResult<Vec<AuthoredMessage>> {
        let messages = self.messages.list(&MessageContainer::Broadcast).await?;
        with_authors(&self.users, messages).await
    }

    pub async fn latest(&self) -> ChatResult<Option<AuthoredMessage>> {
        match self.messages.latest(&MessageContainer::Broadcast).await? {
            Some(message) => Ok(Some(with_author(&self.users, message).await?)),
            None => Ok(None),
        }
    }
}

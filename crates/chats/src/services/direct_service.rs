//! Direct messaging pipeline.

use parley_auth::UserIdentity;
use parley_database::{ConversationRepository, MessageContainer, MessageRepository, Pool};
use tracing::info;

use super::authors::new_message;
use super::directory::UserDirectory;
use crate::types::{ChatResult, ConversationContext, DirectThread, MessageContent, MessageView, PeerView, UserView};
use crate::utils::Validator;

#[derive(Clone)]
pub struct DirectMessageService {
    directory: UserDirectory,
    conversations: ConversationRepository,
    messages: MessageRepository,
}

impl DirectMessageService {
    pub fn new(pool: Pool) -> Self {
        Self {
            directory: UserDirectory::new(pool.clone()),
            conversations: ConversationRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }

    /// Append a message to the sender/receiver thread, creating the thread on
    /// first contact, and return the thread's full history.
    pub async fn submit(
        &self,
        sender: &UserIdentity,
        receiver_id: &str,
        content: MessageContent,
    ) -> ChatResult<DirectThread> {
        let content = Validator::message_content(content)?;
        let receiver = self.directory.find(receiver_id).await?;

        let conversation = self
            .conversations
            .find_or_create(&sender.id, &receiver.id)
            .await?;
        let container = MessageContainer::Conversation(conversation.id.clone());

        let message = self
            .messages
            .append(&container, &new_message(&sender.id, content))
            .await?;

        info!(
            conversation_id = %conversation.id,
            message_id = %message.id,
            sender_id = %sender.id,
            receiver_id = %receiver.id,
            "direct message stored"
        );

        let history = self.messages.list(&container).await?;

        Ok(DirectThread {
            conversation_id: conversation.id,
            participants: vec![conversation.user_low, conversation.user_high],
            messages: history.into_iter().map(MessageView::from).collect(),
        })
    }

    /// Counterpart view plus the pair's history, empty when they never talked.
    pub async fn conversation_context(
        &self,
        viewer: &UserIdentity,
        counterpart_id: &str,
        is_online: impl Fn(&str) -> bool,
    ) -> ChatResult<ConversationContext> {
        let counterpart = self.directory.find(counterpart_id).await?;

        let conversation = self
            .conversations
            .find_by_pair(&viewer.id, &counterpart.id)
            .await?;

        let messages = match &conversation {
            Some(conversation) => self
                .messages
                .list(&MessageContainer::Conversation(conversation.id.clone()))
                .await?
                .into_iter()
                .map(MessageView::from)
                .collect(),
            None => Vec::new(),
        };

        let online = is_online(&counterpart.id);
        Ok(ConversationContext {
            counterpart: PeerView {
                user: UserView::from(counterpart),
                online,
            },
            conversation_id: conversation.map(|conversation| conversation.id),
            messages,
        })
    }
}

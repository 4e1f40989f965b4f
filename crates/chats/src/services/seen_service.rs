//! Seen-state propagation for direct conversations.

use parley_auth::UserIdentity;
use parley_database::{ConversationRepository, MessageRepository, Pool};
use tracing::debug;

use crate::types::{ChatResult, SeenUpdate};
use crate::utils::Validator;

#[derive(Clone)]
pub struct SeenService {
    conversations: ConversationRepository,
    messages: MessageRepository,
}

impl SeenService {
    pub fn new(pool: Pool) -> Self {
        Self {
            conversations: ConversationRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }

    /// Mark everything the counterpart wrote to the viewer as seen. The
    /// viewer's own messages are untouched. Repeating the call is a no-op.
    pub async fn mark_seen(
        &self,
        viewer: &UserIdentity,
        counterpart_id: &str,
    ) -> ChatResult<SeenUpdate> {
        let counterpart_id = Validator::identifier("counterpart_id", counterpart_id)?;
        let participants = vec![viewer.id.clone(), counterpart_id.to_string()];

        let Some(conversation) = self
            .conversations
            .find_by_pair(&viewer.id, counterpart_id)
            .await?
        else {
            return Ok(SeenUpdate {
                conversation_id: None,
                participants,
                updated: 0,
            });
        };

        // In a self-thread every message is the viewer's own.
        let updated = if counterpart_id == viewer.id {
            0
        } else {
            self.messages
                .mark_seen(&conversation.id, counterpart_id)
                .await?
        };

        debug!(
            conversation_id = %conversation.id,
            viewer_id = %viewer.id,
            updated,
            "marked messages seen"
        );

        Ok(SeenUpdate {
            conversation_id: Some(conversation.id),
            participants,
            updated,
        })
    }
}

//! Conversation aggregator: builds a user's ranked sidebar feed.

use parley_auth::UserIdentity;
use parley_database::{
    ConversationRepository, GroupRepository, MessageContainer, MessageRepository, Pool,
    UserRepository,
};
use tracing::{debug, warn};

use super::authors::with_author;
use super::broadcast_service::BroadcastService;
use crate::types::{
    rank_feed, BroadcastEntry, ChatResult, DirectEntry, FeedItem, GroupEntry, MessageView,
    PeerView, UserView,
};

#[derive(Clone)]
pub struct FeedService {
    users: UserRepository,
    conversations: ConversationRepository,
    groups: GroupRepository,
    messages: MessageRepository,
    broadcast: BroadcastService,
}

impl FeedService {
    pub fn new(pool: Pool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            conversations: ConversationRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            broadcast: BroadcastService::new(pool),
        }
    }

    /// Merge direct threads, groups and the broadcast entry, newest first.
    pub async fn build_feed(
        &self,
        user: &UserIdentity,
        is_online: impl Fn(&str) -> bool,
    ) -> ChatResult<Vec<FeedItem>> {
        let mut items = Vec::new();

        for conversation in self.conversations.list_for_user(&user.id).await? {
            let Some(counterpart_id) = conversation.counterpart_of(&user.id) else {
                continue;
            };
            let Some(counterpart) = self.users.find_by_id(counterpart_id).await? else {
                warn!(
                    conversation_id = %conversation.id,
                    counterpart_id,
                    "conversation counterpart missing, skipping feed entry"
                );
                continue;
            };

            let container = MessageContainer::Conversation(conversation.id.clone());
            let last_message = self.messages.latest(&container).await?.map(MessageView::from);
            let unseen_count = self
                .messages
                .count_unseen(&conversation.id, &counterpart.id)
                .await?;
            let online = is_online(&counterpart.id);

            items.push(FeedItem::Direct(DirectEntry {
                conversation_id: conversation.id,
                counterpart: PeerView {
                    user: UserView::from(counterpart),
                    online,
                },
                last_message,
                unseen_count,
                created_at: conversation.created_at,
                updated_at: conversation.updated_at,
            }));
        }

        for group in self.groups.list_for_member(&user.id).await? {
            let last_message = match self
                .messages
                .latest(&MessageContainer::Group(group.id.clone()))
                .await?
            {
                Some(message) => Some(with_author(&self.users, message).await?),
                None => None,
            };

            items.push(FeedItem::Group(GroupEntry {
                member_count: group.members.len(),
                group_id: group.id,
                name: group.name,
                last_message,
                created_at: group.created_at,
                updated_at: group.updated_at,
            }));
        }

        if !user.is_admin {
            if let Some(latest) = self.broadcast.latest().await? {
                items.push(FeedItem::Broadcast(BroadcastEntry::new(latest)));
            }
        }

        debug!(user_id = %user.id, items = items.len(), "feed rebuilt");
        Ok(rank_feed(items))
    }
}

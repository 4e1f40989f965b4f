//! Group messaging pipeline.

use parley_auth::UserIdentity;
use parley_database::{
    GroupRecord, GroupRepository, MessageContainer, MessageRepository, NewGroup, Pool,
    UserRepository,
};
use tracing::info;

use super::authors::{new_message, with_author, with_authors};
use crate::types::{
    AuthoredMessage, ChatError, ChatResult, GroupDetail, GroupMessage, GroupView, MessageContent,
    UserView,
};
use crate::utils::Validator;

#[derive(Clone)]
pub struct GroupService {
    users: UserRepository,
    groups: GroupRepository,
    messages: MessageRepository,
}

impl GroupService {
    pub fn new(pool: Pool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }

    /// Create a group. The creator is always a member and the only admin.
    pub async fn create(
        &self,
        creator: &UserIdentity,
        name: &str,
        member_ids: &[String],
    ) -> ChatResult<GroupView> {
        let name = Validator::group_name(name)?;

        let mut members: Vec<String> = Vec::with_capacity(member_ids.len());
        for id in member_ids {
            let id = Validator::identifier("member_id", id)?;
            if id != creator.id && !members.iter().any(|known| known == id) {
                members.push(id.to_string());
            }
        }

        let known = self.users.find_many(&members).await?;
        if let Some(missing) = members
            .iter()
            .find(|id| !known.iter().any(|user| &user.id == *id))
        {
            return Err(ChatError::validation(format!("unknown member {missing}")));
        }

        let group = self
            .groups
            .create(&NewGroup {
                name,
                created_by: creator.id.clone(),
                member_ids: members,
            })
            .await?;

        self.view(group).await
    }

    /// Append a message from a member and return the event payload for the
    /// group topic.
    pub async fn send(
        &self,
        sender: &UserIdentity,
        group_id: &str,
        content: MessageContent,
    ) -> ChatResult<GroupMessage> {
        let content = Validator::message_content(content)?;
        let group = self.require_member(sender, group_id).await?;

        let message = self
            .messages
            .append(
                &MessageContainer::Group(group.id.clone()),
                &new_message(&sender.id, content),
            )
            .await?;

        info!(
            group_id = %group.id,
            message_id = %message.id,
            sender_id = %sender.id,
            "group message stored"
        );

        Ok(GroupMessage {
            group_id: group.id,
            message: with_author(&self.users, message).await?,
        })
    }

    /// Full ordered history with authors resolved. Members only.
    pub async fn fetch(
        &self,
        viewer: &UserIdentity,
        group_id: &str,
    ) -> ChatResult<Vec<AuthoredMessage>> {
        let group = self.require_member(viewer, group_id).await?;
        self.history(&group.id).await
    }

    pub async fn list_for_user(&self, user: &UserIdentity) -> ChatResult<Vec<GroupView>> {
        let groups = self.groups.list_for_member(&user.id).await?;
        let mut views = Vec::with_capacity(groups.len());
        for group in groups {
            views.push(self.view(group).await?);
        }
        Ok(views)
    }

    pub async fn detail(&self, viewer: &UserIdentity, group_id: &str) -> ChatResult<GroupDetail> {
        let group = self.require_member(viewer, group_id).await?;
        let messages = self.history(&group.id).await?;
        Ok(GroupDetail {
            group: self.view(group).await?,
            messages,
        })
    }

    /// Group ids the user belongs to right now.
    pub async fn memberships(&self, user_id: &str) -> ChatResult<Vec<String>> {
        Ok(self.groups.group_ids_for_member(user_id).await?)
    }

    /// Load the group, failing with not-found or authorization errors.
    pub async fn require_member(
        &self,
        user: &UserIdentity,
        group_id: &str,
    ) -> ChatResult<GroupRecord> {
        let group_id = Validator::identifier("group_id", group_id)?;
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| ChatError::not_found("group", group_id))?;

        if !group.is_member(&user.id) {
            return Err(ChatError::authorization(format!(
                "user {} is not a member of group {}",
                user.id, group.id
            )));
        }

        Ok(group)
    }

    async fn history(&self, group_id: &str) -> ChatResult<Vec<AuthoredMessage>> {
        let messages = self
            .messages
            .list(&MessageContainer::Group(group_id.to_string()))
            .await?;
        with_authors(&self.users, messages).await
    }

    async fn view(&self, group: GroupRecord) -> ChatResult<GroupView> {
        let users: Vec<UserView> = self
            .users
            .find_many(&group.members)
            .await?
            .into_iter()
            .map(UserView::from)
            .collect();
        Ok(GroupView::resolve(group, &users))
    }
}

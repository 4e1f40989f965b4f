//! Routing of inbound client events to the messaging pipelines.
//!
//! Request-style events (`create_group`, `send_group_message`,
//! `fetch_group_messages`) answer with exactly one [`Ack`]. Everything else
//! is fire-and-forget: failures are logged and reported to the acting
//! connection as a tagged error event.

use std::collections::HashSet;

use parley_auth::UserIdentity;
use parley_chats::{AuthoredMessage, ChatError, ChatResult, GroupView};
use tracing::{debug, warn};

use super::connection::Session;
use super::events::{content, Ack, ClientEvent, ServerEvent};
use crate::registry::Topic;
use crate::state::GatewayState;

pub async fn handle_client_event(state: &GatewayState, session: &Session, event: ClientEvent) {
    match event {
        ClientEvent::RequestConversationContext { counterpart_id } => {
            let result = conversation_context(state, session, &counterpart_id).await;
            report(session, "request_conversation_context", result);
        }
        ClientEvent::SendDirectMessage {
            receiver_id,
            text,
            image_url,
            video_url,
        } => {
            let result = send_direct_message(
                state,
                session,
                &receiver_id,
                content(text, image_url, video_url),
            )
            .await;
            report(session, "send_direct_message", result);
        }
        ClientEvent::RequestSidebarRefresh { user_id } => {
            let result = refresh_sidebar(state, session, user_id.as_deref()).await;
            report(session, "request_sidebar_refresh", result);
        }
        ClientEvent::MarkSeen { counterpart_id } => {
            let result = mark_seen(state, session, &counterpart_id).await;
            report(session, "mark_seen", result);
        }
        ClientEvent::CreateGroup {
            request_id,
            name,
            member_ids,
        } => {
            let ack = match create_group(state, session, &name, &member_ids).await {
                Ok(group) => Ack::group(request_id, group),
                Err(err) => failed(session, "create_group", request_id, &err),
            };
            session.reply(ServerEvent::Ack(ack));
        }
        ClientEvent::SendGroupMessage {
            request_id,
            group_id,
            text,
            image_url,
            video_url,
        } => {
            let result = send_group_message(
                state,
                session,
                &group_id,
                content(text, image_url, video_url),
            )
            .await;
            let ack = match result {
                Ok(message) => Ack::message(request_id, message),
                Err(err) => failed(session, "send_group_message", request_id, &err),
            };
            session.reply(ServerEvent::Ack(ack));
        }
        ClientEvent::FetchGroupMessages {
            request_id,
            group_id,
        } => {
            let ack = match state.services.groups.fetch(&session.identity, &group_id).await {
                Ok(messages) => Ack::messages(request_id, messages),
                Err(err) => failed(session, "fetch_group_messages", request_id, &err),
            };
            session.reply(ServerEvent::Ack(ack));
        }
        ClientEvent::JoinGroup { group_id } => {
            let result = join_group(state, session, &group_id).await;
            report(session, "join_group", result);
        }
        ClientEvent::LeaveGroup { group_id } => {
            state
                .registry
                .unsubscribe(session.connection_id, &Topic::Group(group_id));
        }
        ClientEvent::RequestBroadcastHistory => {
            let result = match state.services.broadcast.history().await {
                Ok(messages) => {
                    session.reply(ServerEvent::BroadcastHistory { messages });
                    Ok(())
                }
                Err(err) => Err(err),
            };
            report(session, "request_broadcast_history", result);
        }
        ClientEvent::PostBroadcastMessage {
            text,
            image_url,
            video_url,
        } => {
            let result =
                post_broadcast(state, session, content(text, image_url, video_url)).await;
            report(session, "post_broadcast_message", result);
        }
    }
}

fn report(session: &Session, operation: &'static str, result: ChatResult<()>) {
    if let Err(err) = result {
        warn!(
            user_id = %session.identity.id,
            connection_id = session.connection_id,
            operation,
            code = err.code(),
            error = %err,
            "client event failed"
        );
        session.reply(ServerEvent::from_error(&err));
    }
}

fn failed(
    session: &Session,
    operation: &'static str,
    request_id: Option<String>,
    err: &ChatError,
) -> Ack {
    warn!(
        user_id = %session.identity.id,
        connection_id = session.connection_id,
        operation,
        code = err.code(),
        error = %err,
        "client request failed"
    );
    Ack::failure(request_id, err)
}

async fn conversation_context(
    state: &GatewayState,
    session: &Session,
    counterpart_id: &str,
) -> ChatResult<()> {
    let context = state
        .services
        .direct
        .conversation_context(&session.identity, counterpart_id, state.online_check())
        .await?;

    session
        .reply(ServerEvent::ConversationContext {
            counterpart: context.counterpart,
            conversation_id: context.conversation_id,
            messages: context.messages,
        });

    push_feed(state, &session.identity).await
}

async fn send_direct_message(
    state: &GatewayState,
    session: &Session,
    receiver_id: &str,
    content: parley_chats::MessageContent,
) -> ChatResult<()> {
    let thread = state
        .services
        .direct
        .submit(&session.identity, receiver_id, content)
        .await?;

    let participants: Vec<String> = distinct(&thread.participants);
    let event = ServerEvent::DirectMessageList {
        conversation_id: thread.conversation_id,
        participants: thread.participants,
        messages: thread.messages,
    };
    for participant in &participants {
        state.registry.publish(&Topic::User(participant.clone()), &event);
    }

    push_feeds_for(state, session, &participants).await
}

async fn refresh_sidebar(
    state: &GatewayState,
    session: &Session,
    requested_user: Option<&str>,
) -> ChatResult<()> {
    if let Some(user_id) = requested_user {
        if user_id != session.identity.id {
            return Err(ChatError::authorization(
                "sidebar can only be refreshed for the connected user",
            ));
        }
    }
    push_feed(state, &session.identity).await
}

async fn mark_seen(state: &GatewayState, session: &Session, counterpart_id: &str) -> ChatResult<()> {
    let update = state
        .services
        .seen
        .mark_seen(&session.identity, counterpart_id)
        .await?;

    debug!(
        user_id = %session.identity.id,
        counterpart_id,
        updated = update.updated,
        "messages marked seen"
    );

    push_feeds_for(state, session, &distinct(&update.participants)).await
}

async fn create_group(
    state: &GatewayState,
    session: &Session,
    name: &str,
    member_ids: &[String],
) -> ChatResult<GroupView> {
    let group = state
        .services
        .groups
        .create(&session.identity, name, member_ids)
        .await?;

    let topic = Topic::Group(group.id.clone());
    state.registry.subscribe(session.connection_id, topic.clone());
    state.registry.publish(
        &topic,
        &ServerEvent::GroupCreated {
            group: group.clone(),
        },
    );
    Ok(group)
}

/// Group messages reach the group topic only. Members' sidebars are left as
/// they are until their next refresh.
async fn send_group_message(
    state: &GatewayState,
    session: &Session,
    group_id: &str,
    content: parley_chats::MessageContent,
) -> ChatResult<AuthoredMessage> {
    let posted = state
        .services
        .groups
        .send(&session.identity, group_id, content)
        .await?;

    state.registry.publish(
        &Topic::Group(posted.group_id.clone()),
        &ServerEvent::GroupMessageCreated {
            group_id: posted.group_id,
            message: posted.message.clone(),
        },
    );
    Ok(posted.message)
}

async fn join_group(state: &GatewayState, session: &Session, group_id: &str) -> ChatResult<()> {
    let group = state
        .services
        .groups
        .require_member(&session.identity, group_id)
        .await?;
    state
        .registry
        .subscribe(session.connection_id, Topic::Group(group.id));
    Ok(())
}

/// Full history goes to every connected non-administrator, followed by a
/// fresh feed. A failed feed for one user does not stop the others.
async fn post_broadcast(
    state: &GatewayState,
    session: &Session,
    content: parley_chats::MessageContent,
) -> ChatResult<()> {
    let history = state
        .services
        .broadcast
        .post(&session.identity, content)
        .await?;

    let event = ServerEvent::BroadcastHistory { messages: history };
    let recipients: Vec<UserIdentity> = state
        .registry
        .connected_identities()
        .into_iter()
        .filter(|identity| !identity.is_admin)
        .collect();

    for recipient in &recipients {
        state
            .registry
            .publish(&Topic::User(recipient.id.clone()), &event);
    }

    let mut first_error = None;
    for recipient in &recipients {
        if let Err(err) = push_feed(state, recipient).await {
            warn!(user_id = %recipient.id, error = %err, "feed refresh after broadcast failed");
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Rebuild the user's feed and push it to their topic.
async fn push_feed(state: &GatewayState, user: &UserIdentity) -> ChatResult<()> {
    let topic = Topic::User(user.id.clone());
    if state.registry.subscriber_count(&topic) == 0 {
        return Ok(());
    }

    let items = state
        .services
        .feed
        .build_feed(user, state.online_check())
        .await?;
    let delivered = state
        .registry
        .publish(&topic, &ServerEvent::SidebarFeed { items });
    debug!(user_id = %user.id, delivered, "sidebar feed pushed");
    Ok(())
}

async fn push_feed_for(state: &GatewayState, session: &Session, user_id: &str) -> ChatResult<()> {
    if user_id == session.identity.id {
        return push_feed(state, &session.identity).await;
    }
    if state
        .registry
        .subscriber_count(&Topic::User(user_id.to_string()))
        == 0
    {
        return Ok(());
    }
    let user = UserIdentity::from(state.services.directory.find(user_id).await?);
    push_feed(state, &user).await
}

/// Every participant gets a feed attempt. The first failure is returned.
async fn push_feeds_for(
    state: &GatewayState,
    session: &Session,
    participants: &[String],
) -> ChatResult<()> {
    let mut first_error = None;
    for participant in participants {
        if let Err(err) = push_feed_for(state, session, participant).await {
            warn!(user_id = %participant, error = %err, "feed refresh failed");
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn distinct(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

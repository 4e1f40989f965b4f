//! Wire events for the realtime channel.

use parley_chats::{
    AuthoredMessage, ChatError, FeedItem, GroupView, MessageContent, MessageView, PeerView,
};
use serde::{Deserialize, Serialize};

/// Events received from clients. Request-style events carry an optional
/// `request_id` that is echoed back in the matching [`Ack`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    RequestConversationContext {
        counterpart_id: String,
    },
    SendDirectMessage {
        receiver_id: String,
        text: Option<String>,
        image_url: Option<String>,
        video_url: Option<String>,
    },
    RequestSidebarRefresh {
        user_id: Option<String>,
    },
    MarkSeen {
        counterpart_id: String,
    },
    CreateGroup {
        request_id: Option<String>,
        name: String,
        #[serde(default)]
        member_ids: Vec<String>,
    },
    SendGroupMessage {
        request_id: Option<String>,
        group_id: String,
        text: Option<String>,
        image_url: Option<String>,
        video_url: Option<String>,
    },
    FetchGroupMessages {
        request_id: Option<String>,
        group_id: String,
    },
    JoinGroup {
        group_id: String,
    },
    LeaveGroup {
        group_id: String,
    },
    RequestBroadcastHistory,
    PostBroadcastMessage {
        text: Option<String>,
        image_url: Option<String>,
        video_url: Option<String>,
    },
}

pub(crate) fn content(
    text: Option<String>,
    image_url: Option<String>,
    video_url: Option<String>,
) -> MessageContent {
    MessageContent {
        text,
        image_url,
        video_url,
    }
}

/// Events pushed to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Hello {
        user_id: String,
    },
    PresenceUpdate {
        user_ids: Vec<String>,
    },
    ConversationContext {
        counterpart: PeerView,
        conversation_id: Option<String>,
        messages: Vec<MessageView>,
    },
    DirectMessageList {
        conversation_id: String,
        participants: Vec<String>,
        messages: Vec<MessageView>,
    },
    SidebarFeed {
        items: Vec<FeedItem>,
    },
    GroupCreated {
        group: GroupView,
    },
    GroupMessageCreated {
        group_id: String,
        message: AuthoredMessage,
    },
    BroadcastHistory {
        messages: Vec<AuthoredMessage>,
    },
    Ack(Ack),
    AuthenticationError {
        message: String,
    },
    AuthorizationError {
        message: String,
    },
    ValidationError {
        message: String,
    },
    NotFoundError {
        message: String,
    },
    StorageError {
        message: String,
    },
}

impl ServerEvent {
    /// Tagged error event for a failed fire-and-forget operation.
    pub fn from_error(err: &ChatError) -> Self {
        let message = public_message(err);
        match err {
            ChatError::Authentication { .. } => Self::AuthenticationError { message },
            ChatError::Authorization { .. } => Self::AuthorizationError { message },
            ChatError::Validation { .. } => Self::ValidationError { message },
            ChatError::NotFound { .. } => Self::NotFoundError { message },
            ChatError::Storage(_) => Self::StorageError { message },
        }
    }

    /// Reply to a frame that did not parse as a [`ClientEvent`]. A request-style
    /// frame still gets its failed ack so the caller is not left waiting.
    pub fn malformed(text: &str, err: &serde_json::Error) -> Self {
        let failure = ChatError::validation(format!("malformed event: {err}"));
        let Ok(frame) = serde_json::from_str::<serde_json::Value>(text) else {
            return Self::from_error(&failure);
        };
        let kind = frame.get("type").and_then(serde_json::Value::as_str);
        if !matches!(
            kind,
            Some("create_group" | "send_group_message" | "fetch_group_messages")
        ) {
            return Self::from_error(&failure);
        }
        let request_id = frame
            .get("request_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        Self::Ack(Ack::failure(request_id, &failure))
    }
}

/// Completion of a request-style event. Exactly one is sent per request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ack {
    pub request_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<AuthoredMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<AuthoredMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AckError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AckError {
    pub code: &'static str,
    pub message: String,
}

impl Ack {
    pub fn group(request_id: Option<String>, group: GroupView) -> Self {
        Self {
            request_id,
            success: true,
            group: Some(group),
            ..Self::default()
        }
    }

    pub fn message(request_id: Option<String>, message: AuthoredMessage) -> Self {
        Self {
            request_id,
            success: true,
            message: Some(message),
            ..Self::default()
        }
    }

    pub fn messages(request_id: Option<String>, messages: Vec<AuthoredMessage>) -> Self {
        Self {
            request_id,
            success: true,
            messages: Some(messages),
            ..Self::default()
        }
    }

    pub fn failure(request_id: Option<String>, err: &ChatError) -> Self {
        Self {
            request_id,
            success: false,
            error: Some(AckError {
                code: err.code(),
                message: public_message(err),
            }),
            ..Self::default()
        }
    }
}

/// Storage details stay in the logs.
fn public_message(err: &ChatError) -> String {
    match err {
        ChatError::Storage(_) => "storage is temporarily unavailable".to_string(),
        other => other.to_string(),
    }
}

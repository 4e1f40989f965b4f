//! Websocket session lifecycle: authenticate, subscribe, pump events, clean up.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap},
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use parley_auth::{bearer_token, UserIdentity};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::events::{ClientEvent, ServerEvent};
use super::handlers::handle_client_event;
use crate::registry::{deliver, ConnectionId, Topic};
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    pub token: Option<String>,
}

/// One authenticated connection as seen by event handlers.
pub struct Session {
    pub connection_id: ConnectionId,
    pub identity: UserIdentity,
    pub(crate) outbound: mpsc::Sender<ServerEvent>,
}

impl Session {
    /// Send an event to this connection only, with the same drop policy as
    /// topic fan-out.
    pub fn reply(&self, event: ServerEvent) -> bool {
        deliver(self.connection_id, &self.outbound, event)
    }
}

/// Upgrade handler. The credential comes from `?token=` or a bearer header.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<WebSocketQuery>,
    headers: HeaderMap,
) -> Response {
    let credential = query.token.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_owned)
    });

    ws.on_upgrade(move |socket| handle_socket(socket, state, credential))
}

async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>, credential: Option<String>) {
    let (mut sink, mut stream) = socket.split();

    let identity = match state.authenticator.authenticate(credential.as_deref()).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!(error = %err, "websocket authentication failed");
            let event = ServerEvent::AuthenticationError {
                message: err.to_string(),
            };
            reject(&mut sink, &event).await;
            return;
        }
    };

    let memberships = match state.services.groups.memberships(&identity.id).await {
        Ok(ids) => ids,
        Err(err) => {
            error!(user_id = %identity.id, error = %err, "failed to load group memberships");
            reject(&mut sink, &ServerEvent::from_error(&err)).await;
            return;
        }
    };

    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(state.outbound_buffer);

    let send_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(err) => error!(error = %err, "failed to serialize server event"),
            }
        }
    });

    // Queued ahead of registration so it is always the first frame.
    let _ = out_tx
        .send(ServerEvent::Hello {
            user_id: identity.id.clone(),
        })
        .await;

    let topics = std::iter::once(Topic::User(identity.id.clone()))
        .chain(memberships.into_iter().map(Topic::Group));
    let connection_id = state
        .registry
        .register(identity.clone(), out_tx.clone(), topics);

    info!(connection_id, user_id = %identity.id, "websocket connected");
    state.presence.on_connect(&identity.id);

    let session = Arc::new(Session {
        connection_id,
        identity,
        outbound: out_tx,
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    let state = state.clone();
                    let session = session.clone();
                    tokio::spawn(async move {
                        handle_client_event(&state, &session, event).await;
                    });
                }
                Err(err) => {
                    debug!(connection_id, error = %err, "malformed client event");
                    session.reply(ServerEvent::malformed(&text, &err));
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(connection_id, error = %err, "websocket receive failed");
                break;
            }
        }
    }

    state.registry.remove(connection_id);
    state.presence.on_disconnect(&session.identity.id);
    send_task.abort();

    info!(connection_id, user_id = %session.identity.id, "websocket disconnected");
}

/// Send a final event and close the socket.
async fn reject(sink: &mut SplitSink<WebSocket, Message>, event: &ServerEvent) {
    if let Ok(text) = serde_json::to_string(event) {
        let _ = sink.send(Message::Text(text)).await;
    }
    let _ = sink.send(Message::Close(None)).await;
}

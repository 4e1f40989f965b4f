//! Realtime channel

pub mod connection;
pub mod events;
pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::GatewayState;

pub use connection::{websocket_handler, Session};
pub use events::{Ack, ClientEvent, ServerEvent};

pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/ws", get(websocket_handler))
}

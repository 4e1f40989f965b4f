//! # Parley Gateway Crate
//!
//! Realtime and HTTP surface for Parley.
//!
//! - **WebSocket** (`/ws`): authenticates each connection, subscribes it to its
//!   user topic and its groups' topics, and routes inbound events to the chat
//!   pipelines
//! - **Registry**: topic to subscriber map used for fan-out
//! - **Presence**: the process-wide online set
//! - **REST**: health plus a few read-only lookups
//!
//! ```rust,ignore
//! use parley_gateway::{create_router, GatewayState};
//!
//! let state = GatewayState::new(pool, authenticator, &config.realtime);
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod middleware;
pub mod presence;
pub mod registry;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use presence::PresenceTracker;
pub use registry::{ConnectionId, Topic, TopicRegistry};
pub use state::GatewayState;
pub use websocket::{ClientEvent, ServerEvent};

use std::sync::Arc;

use axum::{http::Method, middleware as axum_middleware, Router};
use tower_http::cors::{Any, CorsLayer};

pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .merge(rest::create_rest_routes(state.clone()))
        .merge(websocket::create_websocket_routes())
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}

//! REST API endpoints for the gateway

pub mod groups;
pub mod health;
pub mod users;

use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};

use crate::middleware::auth_middleware;
use crate::state::GatewayState;

/// Health is public; everything under `/api` needs a bearer credential.
pub fn create_rest_routes(state: Arc<GatewayState>) -> Router<Arc<GatewayState>> {
    let protected = Router::new()
        .merge(users::create_user_routes())
        .merge(groups::create_group_routes())
        .route_layer(axum_middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(protected)
}

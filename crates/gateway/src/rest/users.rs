//! User directory endpoint

use std::sync::Arc;

use axum::{extract::State, routing::get, Extension, Json, Router};
use parley_auth::UserIdentity;
use parley_chats::UserView;

use crate::error::GatewayResult;
use crate::state::GatewayState;

pub fn create_user_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/api/users", get(list_users))
}

/// Everyone except the caller, for picking group members.
pub async fn list_users(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<UserIdentity>,
) -> GatewayResult<Json<Vec<UserView>>> {
    let users = state.services.directory.list_others(&identity).await?;
    Ok(Json(users))
}

//! Group REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use parley_auth::UserIdentity;
use parley_chats::{GroupDetail, GroupView};

use crate::error::GatewayResult;
use crate::state::GatewayState;

pub fn create_group_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/groups", get(list_groups))
        .route("/api/groups/:group_id", get(get_group))
}

pub async fn list_groups(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<UserIdentity>,
) -> GatewayResult<Json<Vec<GroupView>>> {
    let groups = state.services.groups.list_for_user(&identity).await?;
    Ok(Json(groups))
}

/// Members, admins and full history. 404 for unknown groups, 403 for
/// non-members.
pub async fn get_group(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(group_id): Path<String>,
) -> GatewayResult<Json<GroupDetail>> {
    let detail = state.services.groups.detail(&identity, &group_id).await?;
    Ok(Json(detail))
}

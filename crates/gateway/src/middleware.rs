//! Middleware for authentication and request logging

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use parley_auth::bearer_token;

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Resolve the bearer credential to a [`parley_auth::UserIdentity`] and stash
/// it in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned);

    let identity = state.authenticator.authenticate(token.as_deref()).await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

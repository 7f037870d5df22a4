use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use services::auth::{AuthError, User};
use tracing::debug;

/// Authenticated user information passed to route handlers
#[derive(Clone)]
pub struct AuthenticatedUser(pub User);

/// Bearer-token authentication. A missing or malformed header is
/// rejected before any provider call is made.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::Unauthorized)?;

    let user = state.auth.current_user(token).await?;
    debug!("Authenticated request for user {}", user.id);

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

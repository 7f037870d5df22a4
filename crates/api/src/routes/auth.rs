use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{LoginResponse, MessageResponse, RefreshRequest, RefreshResponse, UserProfile};
use crate::routes::apply_cookies;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use config::RefreshTokenTransport;
use serde::Deserialize;
use services::auth::AuthError;
use tracing::debug;

/// Start the login flow: set the state cookie and redirect to the
/// provider consent screen.
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    debug!("Initiating Google OAuth flow");

    let redirect = state.auth.login()?;
    let jar = apply_cookies(jar, &redirect.cookies);

    Ok((jar, Redirect::temporary(&redirect.authorize_url)))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub state: String,
    pub code: String,
}

/// Provider redirect target. The state cookie set at login time must
/// accompany this request.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let stored = jar
        .get(&state.auth_config.state_cookie)
        .map(|c| c.value().to_string());

    let session = state
        .auth
        .callback(stored.as_deref(), &params.state, &params.code)
        .await?;

    let jar = apply_cookies(jar, &session.cookies);
    let body = LoginResponse::new(session.user, session.token, session.refresh_token);

    Ok((jar, Json(body)))
}

/// Locate the refresh token in the configured transport: the cookie
/// jar, or the request body.
fn refresh_token_from(
    state: &AppState,
    jar: &CookieJar,
    body: Option<RefreshRequest>,
) -> Option<String> {
    match state.auth_config.refresh_transport {
        RefreshTokenTransport::Cookie => jar
            .get(&state.auth_config.refresh_cookie)
            .map(|c| c.value().to_string()),
        RefreshTokenTransport::Body => body.and_then(|b| b.refresh_token),
    }
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let token =
        refresh_token_from(&state, &jar, body.map(|Json(b)| b)).ok_or(AuthError::TokenNotFound)?;

    let refreshed = state.auth.refresh(&token).await?;
    let jar = apply_cookies(jar, &refreshed.cookies);

    Ok((
        jar,
        Json(RefreshResponse {
            token_type: refreshed.token_type,
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let token = refresh_token_from(&state, &jar, body.map(|Json(b)| b));

    let outcome = state.auth.logout(token.as_deref()).await?;
    let jar = apply_cookies(jar, &outcome.cookies);

    Ok((
        jar,
        Json(MessageResponse {
            message: "logged out".to_string(),
        }),
    ))
}

/// Profile of the user the bearer token belongs to. Authentication
/// happens in the middleware; by the time this runs the user is known.
pub async fn current_user(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<UserProfile> {
    Json(user.into())
}

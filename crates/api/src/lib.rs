pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use config::AuthConfig;
use services::auth::AuthService;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub auth_config: AuthConfig,
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/current-user", get(routes::auth::current_user))
        .route("/users", get(routes::users::list_users))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/auth/login", get(routes::auth::google_login))
        .route("/auth/login/callback", get(routes::auth::oauth_callback))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/health", get(routes::health::health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

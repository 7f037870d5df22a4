use crate::models::ErrorResponse;
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use services::auth::AuthError;
use tracing::error;

/// Single translation point from domain errors to HTTP responses.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub AuthError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self.0 {
            AuthError::StateMismatch => (
                StatusCode::BAD_REQUEST,
                "state_mismatch",
                self.0.to_string(),
            ),
            AuthError::Unauthorized | AuthError::TokenNotFound | AuthError::UserNotFound => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.0.to_string())
            }
            AuthError::ExchangeFailed(_) | AuthError::NetworkError(_) => (
                StatusCode::BAD_GATEWAY,
                "provider_error",
                self.0.to_string(),
            ),
            AuthError::DecodeError(_) | AuthError::ConfigError(_) | AuthError::InternalError(_) => {
                // Internal detail stays in the logs
                error!("Internal error: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse::new(message, error_type.to_string())),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AuthError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(status_of(AuthError::StateMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::TokenNotFound), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::UserNotFound), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AuthError::ExchangeFailed("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AuthError::NetworkError("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AuthError::DecodeError("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AuthError::InternalError("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

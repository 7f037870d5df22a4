pub mod google;
pub mod id_token;
pub mod mock;
pub mod ports;
pub mod state;
pub mod tokens;
pub mod user_service;

pub use google::GoogleOAuthClient;
pub use id_token::IdTokenDecoder;
pub use ports::{
    AuthError, AuthenticatedSession, CookieDirective, LoginRedirect, LogoutOutcome, ProviderClient,
    RefreshedTokens, TokenPayload, TokenRecord, TokenRepository, User, UserId, UserRepository,
};
pub use state::StateCodec;
pub use tokens::TokenStore;
pub use user_service::UserResolver;

use config::{AuthConfig, RefreshTokenTransport};
use std::sync::Arc;
use tracing::{info, warn};

/// Login-with-Google orchestrator.
///
/// Owns the whole flow from the authorization redirect to logout. The
/// transport layer only moves parameters in and cookie directives out;
/// every decision lives here or below.
pub struct AuthService {
    provider: Arc<dyn ProviderClient>,
    state: StateCodec,
    users: UserResolver,
    tokens: TokenStore,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        user_repository: Arc<dyn UserRepository>,
        token_repository: Arc<dyn TokenRepository>,
        config: AuthConfig,
    ) -> Self {
        Self {
            provider,
            state: StateCodec::new(config.state_entropy_bytes),
            users: UserResolver::new(IdTokenDecoder, user_repository),
            tokens: TokenStore::new(token_repository),
            config,
        }
    }

    /// Start a login attempt: mint a state token and build the
    /// provider authorization URL carrying it. The state cookie binds
    /// the browser that started the flow to the callback.
    pub fn login(&self) -> Result<LoginRedirect, AuthError> {
        let state = self.state.generate();
        let authorize_url = self.provider.authorization_url(&state)?;

        Ok(LoginRedirect {
            authorize_url,
            cookies: vec![CookieDirective::set(&self.config.state_cookie, state)],
        })
    }

    /// Complete a login attempt. `stored_state` is the state cookie as
    /// the browser presented it; a missing cookie fails the same way a
    /// wrong one does.
    pub async fn callback(
        &self,
        stored_state: Option<&str>,
        state: &str,
        code: &str,
    ) -> Result<AuthenticatedSession, AuthError> {
        let stored = stored_state.ok_or(AuthError::StateMismatch)?;
        self.state.compare(state, stored)?;

        let payload = self.provider.exchange_code(code).await?;
        let id_token = payload.id_token.as_deref().ok_or_else(|| {
            AuthError::ExchangeFailed("token response carried no identity token".to_string())
        })?;

        let user = self.users.resolve(id_token).await?;
        let token = self.tokens.upsert(user.id, &payload).await?;

        info!("Login completed for user {}", user.id);

        // The state cookie is single-use; clear it no matter what
        let mut cookies = vec![CookieDirective::remove(&self.config.state_cookie)];
        let mut refresh_token = None;
        match self.config.refresh_transport {
            RefreshTokenTransport::Cookie => {
                if let Some(rt) = &payload.refresh_token {
                    cookies.push(CookieDirective::set(&self.config.refresh_cookie, rt));
                }
            }
            RefreshTokenTransport::Body => {
                refresh_token = token.refresh_token.clone();
            }
        }

        Ok(AuthenticatedSession {
            user,
            token,
            refresh_token,
            cookies,
        })
    }

    /// Resolve the user an access token belongs to. The provider must
    /// recognize the token AND it must match the active stored record;
    /// a token the provider still accepts but that we have since
    /// replaced or deactivated is rejected.
    pub async fn current_user(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.provider.introspect(access_token).await?;

        let user = self
            .users
            .get_by_subject(&claims.user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let record = self
            .tokens
            .find_by_user(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if record.access_token != access_token || !record.is_active {
            warn!("Stale or deactivated access token presented for user {}", user.id);
            return Err(AuthError::Unauthorized);
        }

        Ok(user)
    }

    /// Exchange a refresh token for a fresh access token. Identity
    /// comes from the stored record the refresh token maps to, so only
    /// tokens we issued and have not deactivated are accepted.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        let record = self
            .tokens
            .find_active_by_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let stored = record
            .refresh_token
            .as_deref()
            .ok_or(AuthError::TokenNotFound)?;
        let payload = self.provider.refresh_token(stored).await?;
        self.tokens.upsert(record.user_id, &payload).await?;

        let mut cookies = Vec::new();
        let mut rotated = None;
        match self.config.refresh_transport {
            RefreshTokenTransport::Cookie => {
                if let Some(rt) = &payload.refresh_token {
                    cookies.push(CookieDirective::set(&self.config.refresh_cookie, rt));
                }
            }
            RefreshTokenTransport::Body => {
                rotated = payload.refresh_token.clone();
            }
        }

        Ok(RefreshedTokens {
            token_type: payload.token_type,
            access_token: payload.access_token,
            refresh_token: rotated,
            cookies,
        })
    }

    /// End the session the refresh token belongs to. Unknown or absent
    /// tokens still succeed; logout is idempotent and never leaks
    /// whether a token existed.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<LogoutOutcome, AuthError> {
        if let Some(rt) = refresh_token {
            if let Some(record) = self.tokens.find_active_by_refresh_token(rt).await? {
                self.tokens.deactivate(record.user_id).await?;
                info!("Logged out user {}", record.user_id);
            }
        }

        Ok(LogoutOutcome {
            cookies: vec![CookieDirective::remove(&self.config.refresh_cookie)],
        })
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), AuthError> {
        self.users.list(limit, offset).await
    }
}

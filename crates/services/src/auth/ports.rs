use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Domain ID types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TokenRecordId(pub Uuid);

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        UserId(uuid)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for TokenRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Domain models

/// Local user record keyed by the provider-issued subject.
///
/// Created exactly once, on first successful login for a subject.
/// Never mutated or deleted by the auth flow after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub provider_subject: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub provider_subject: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Persisted provider token pair. At most one row exists per user;
/// repeat logins and refreshes overwrite it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: TokenRecordId,
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub provider: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTokenRecord {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub provider: String,
    pub is_active: bool,
}

/// Partial update for a token record. `None` fields are skipped, not
/// written as null; a refresh response without a rotated refresh token
/// must not clear the stored one.
#[derive(Debug, Clone, Default)]
pub struct TokenUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Raw token-endpoint response from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub access_token: String,
    /// Absent on refresh when the provider does not rotate
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
    /// Present on the authorization-code grant
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Claims extracted from a provider identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Introspection (tokeninfo) response for an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionClaims {
    /// Provider subject the access token was issued for
    #[serde(alias = "sub")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Cookie side effect for the transport layer to apply. The core never
/// touches response objects directly; orchestrator results carry these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub path: String,
    pub remove: bool,
}

impl CookieDirective {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            http_only: true,
            secure: true,
            path: "/".to_string(),
            remove: false,
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            http_only: true,
            secure: true,
            path: "/".to_string(),
            remove: true,
        }
    }
}

// Orchestrator results

/// Result of the login step: where to send the client, and the state
/// cookie binding this login attempt.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub authorize_url: String,
    pub cookies: Vec<CookieDirective>,
}

/// Result of a successful callback: the resolved user, the persisted
/// token record, and the session materials for the client.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub token: TokenRecord,
    /// Set when the refresh transport is the response body
    pub refresh_token: Option<String>,
    pub cookies: Vec<CookieDirective>,
}

#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub token_type: String,
    pub access_token: String,
    /// Set when the transport is the response body and the provider rotated
    pub refresh_token: Option<String>,
    pub cookies: Vec<CookieDirective>,
}

#[derive(Debug, Clone)]
pub struct LogoutOutcome {
    pub cookies: Vec<CookieDirective>,
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("state mismatch")]
    StateMismatch,

    #[error("failed to decode identity token: {0}")]
    DecodeError(String),

    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("refresh token not found or inactive")]
    TokenNotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("user not found")]
    UserNotFound,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

// Repository traits
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User>;

    async fn get_by_id(&self, id: UserId) -> anyhow::Result<Option<User>>;

    async fn get_by_subject(&self, provider_subject: &str) -> anyhow::Result<Option<User>>;

    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>>;

    async fn count(&self) -> anyhow::Result<i64>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert(&self, record: NewTokenRecord) -> anyhow::Result<TokenRecord>;

    /// Partial update; `None` fields in `changes` keep their stored value
    async fn update(&self, id: TokenRecordId, changes: TokenUpdate)
        -> anyhow::Result<TokenRecord>;

    async fn get_by_user(&self, user_id: UserId) -> anyhow::Result<Option<TokenRecord>>;

    async fn get_active_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> anyhow::Result<Option<TokenRecord>>;

    /// Returns whether any row changed; deactivating a missing or
    /// already-inactive record is a no-op, not an error
    async fn deactivate_for_user(&self, user_id: UserId) -> anyhow::Result<bool>;
}

/// Identity-provider interactions. One HTTP attempt per call, no
/// retries: an authorization code can only be exchanged once, so a
/// blind retry is never safe.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Pure URL construction, no I/O
    fn authorization_url(&self, state: &str) -> Result<String, AuthError>;

    async fn exchange_code(&self, code: &str) -> Result<TokenPayload, AuthError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPayload, AuthError>;

    /// Non-200 from the introspection endpoint means the token is not
    /// valid, which is `Unauthorized` rather than a transport error
    async fn introspect(&self, access_token: &str) -> Result<IntrospectionClaims, AuthError>;
}

//! In-memory repositories and a canned identity provider.
//!
//! Used by unit tests and by the `AUTH_MOCK` development mode, which
//! runs the full flow against deterministic fakes instead of Google
//! and Postgres.

use super::ports::{
    AuthError, IdentityClaims, IntrospectionClaims, NewTokenRecord, NewUser, ProviderClient,
    TokenPayload, TokenRecord, TokenRecordId, TokenRepository, TokenUpdate, User, UserId,
    UserRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Build an unsigned-in-spirit identity token for the mock provider.
/// The decoder never checks the signature, so any key works.
pub fn mock_id_token(sub: &str, email: &str) -> String {
    let claims = IdentityClaims {
        sub: sub.to_string(),
        email: email.to_string(),
        name: Some("Mock User".to_string()),
        picture: None,
    };

    // Encoding with a fixed throwaway secret cannot fail for these claims
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"mock"),
    )
    .unwrap_or_default()
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|u| u.provider_subject == new_user.provider_subject)
        {
            anyhow::bail!("duplicate provider subject");
        }

        let user = User {
            id: UserId(Uuid::new_v4()),
            provider_subject: new_user.provider_subject,
            email: new_user.email,
            full_name: new_user.full_name,
            avatar_url: new_user.avatar_url,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_subject(&self, provider_subject: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| u.provider_subject == provider_subject)
            .cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let users = self.users.lock().await;
        Ok(users.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryTokenRepository {
    tokens: Mutex<Vec<TokenRecord>>,
}

impl InMemoryTokenRepository {
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn insert(&self, record: NewTokenRecord) -> anyhow::Result<TokenRecord> {
        let mut tokens = self.tokens.lock().await;
        if tokens.iter().any(|t| t.user_id == record.user_id) {
            anyhow::bail!("token record already exists for user");
        }

        let now = Utc::now();
        let token = TokenRecord {
            id: TokenRecordId(Uuid::new_v4()),
            user_id: record.user_id,
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            token_type: record.token_type,
            expires_at: record.expires_at,
            provider: record.provider,
            is_active: record.is_active,
            created_at: now,
            updated_at: now,
        };
        tokens.push(token.clone());
        Ok(token)
    }

    async fn update(
        &self,
        id: TokenRecordId,
        changes: TokenUpdate,
    ) -> anyhow::Result<TokenRecord> {
        let mut tokens = self.tokens.lock().await;
        let token = tokens
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("token record not found"))?;

        if let Some(access_token) = changes.access_token {
            token.access_token = access_token;
        }
        if let Some(refresh_token) = changes.refresh_token {
            token.refresh_token = Some(refresh_token);
        }
        if let Some(token_type) = changes.token_type {
            token.token_type = token_type;
        }
        if let Some(expires_at) = changes.expires_at {
            token.expires_at = expires_at;
        }
        if let Some(is_active) = changes.is_active {
            token.is_active = is_active;
        }
        token.updated_at = Utc::now();

        Ok(token.clone())
    }

    async fn get_by_user(&self, user_id: UserId) -> anyhow::Result<Option<TokenRecord>> {
        let tokens = self.tokens.lock().await;
        Ok(tokens.iter().find(|t| t.user_id == user_id).cloned())
    }

    async fn get_active_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> anyhow::Result<Option<TokenRecord>> {
        let tokens = self.tokens.lock().await;
        Ok(tokens
            .iter()
            .find(|t| t.is_active && t.refresh_token.as_deref() == Some(refresh_token))
            .cloned())
    }

    async fn deactivate_for_user(&self, user_id: UserId) -> anyhow::Result<bool> {
        let mut tokens = self.tokens.lock().await;
        match tokens
            .iter_mut()
            .find(|t| t.user_id == user_id && t.is_active)
        {
            Some(token) => {
                token.is_active = false;
                token.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Deterministic provider: tokens are derived from the authorization
/// code, and introspection only knows tokens this client issued.
#[derive(Default)]
pub struct MockProviderClient {
    issued: Mutex<HashMap<String, String>>,
    refresh_counter: AtomicU64,
    /// When set, the next refresh response rotates the refresh token
    pub rotate_on_refresh: bool,
}

impl MockProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rotation() -> Self {
        Self {
            rotate_on_refresh: true,
            ..Self::default()
        }
    }

    /// Make an arbitrary access token introspectable, for tests that
    /// bypass the exchange step.
    pub async fn register_token(&self, access_token: &str, subject: &str) {
        self.issued
            .lock()
            .await
            .insert(access_token.to_string(), subject.to_string());
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        Ok(format!(
            "https://mock.invalid/authorize?response_type=code&state={state}"
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPayload, AuthError> {
        if code.is_empty() {
            return Err(AuthError::ExchangeFailed(
                "provider returned status 400".to_string(),
            ));
        }

        let sub = format!("mock-{code}");
        let access_token = format!("mock-access-{code}");
        self.issued
            .lock()
            .await
            .insert(access_token.clone(), sub.clone());

        Ok(TokenPayload {
            access_token,
            refresh_token: Some(format!("mock-refresh-{code}")),
            expires_in: 3600,
            token_type: "Bearer".to_string(),
            id_token: Some(mock_id_token(&sub, &format!("{sub}@example.com"))),
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPayload, AuthError> {
        // Recover the subject the refresh token was minted for
        let sub = match refresh_token.strip_prefix("mock-refresh-") {
            Some(code) => format!("mock-{code}"),
            None => {
                return Err(AuthError::ExchangeFailed(
                    "provider returned status 400".to_string(),
                ))
            }
        };

        let n = self.refresh_counter.fetch_add(1, Ordering::Relaxed);
        let access_token = format!("mock-access-{sub}-r{n}");
        self.issued
            .lock()
            .await
            .insert(access_token.clone(), sub.clone());

        Ok(TokenPayload {
            access_token,
            refresh_token: self
                .rotate_on_refresh
                .then(|| format!("{refresh_token}-r{n}")),
            expires_in: 3600,
            token_type: "Bearer".to_string(),
            id_token: None,
        })
    }

    async fn introspect(&self, access_token: &str) -> Result<IntrospectionClaims, AuthError> {
        let issued = self.issued.lock().await;
        match issued.get(access_token) {
            Some(sub) => Ok(IntrospectionClaims {
                user_id: sub.clone(),
                email: Some(format!("{sub}@example.com")),
                expires_in: Some(3600),
                scope: Some("openid email profile".to_string()),
            }),
            None => Err(AuthError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn partial_update_skips_none_fields() {
        let repo = InMemoryTokenRepository::default();
        let inserted = repo
            .insert(NewTokenRecord {
                user_id: UserId(Uuid::new_v4()),
                access_token: "AT".to_string(),
                refresh_token: Some("RT".to_string()),
                token_type: "Bearer".to_string(),
                expires_at: Utc::now(),
                provider: "google".to_string(),
                is_active: true,
            })
            .await
            .unwrap();

        let updated = repo
            .update(
                inserted.id,
                TokenUpdate {
                    access_token: Some("AT2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.access_token, "AT2");
        assert_eq!(updated.refresh_token.as_deref(), Some("RT"));
        assert_eq!(updated.token_type, "Bearer");
        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn provider_only_introspects_issued_tokens() {
        let provider = MockProviderClient::new();

        let payload = provider.exchange_code("abc").await.unwrap();
        let claims = provider.introspect(&payload.access_token).await.unwrap();
        assert_eq!(claims.user_id, "mock-abc");

        assert!(matches!(
            provider.introspect("never-issued").await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn refresh_does_not_rotate_by_default() {
        let provider = MockProviderClient::new();
        provider.exchange_code("abc").await.unwrap();

        let refreshed = provider.refresh_token("mock-refresh-abc").await.unwrap();
        assert!(refreshed.refresh_token.is_none());
        assert!(refreshed.id_token.is_none());

        let rotating = MockProviderClient::with_rotation();
        let refreshed = rotating.refresh_token("mock-refresh-abc").await.unwrap();
        assert!(refreshed.refresh_token.is_some());
    }
}

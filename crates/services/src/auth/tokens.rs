use super::ports::{
    AuthError, NewTokenRecord, TokenPayload, TokenRecord, TokenRepository, TokenUpdate, UserId,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

pub const PROVIDER_GOOGLE: &str = "google";

/// Token persistence with upsert-by-user semantics: a user logging in
/// or refreshing twice never accumulates rows.
pub struct TokenStore {
    repository: Arc<dyn TokenRepository>,
}

impl TokenStore {
    pub fn new(repository: Arc<dyn TokenRepository>) -> Self {
        Self { repository }
    }

    /// Persist a provider token payload for a user. Updates the
    /// existing record in place when one exists, otherwise creates it.
    /// A payload without a refresh token (rotationless refresh) leaves
    /// the stored refresh token untouched.
    pub async fn upsert(
        &self,
        user_id: UserId,
        payload: &TokenPayload,
    ) -> Result<TokenRecord, AuthError> {
        let expires_at = Utc::now() + Duration::seconds(payload.expires_in);

        let existing = self
            .repository
            .get_by_user(user_id)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to look up token: {e}")))?;

        match existing {
            Some(record) => {
                debug!("Updating token record for user {user_id}");
                self.repository
                    .update(
                        record.id,
                        TokenUpdate {
                            access_token: Some(payload.access_token.clone()),
                            refresh_token: payload.refresh_token.clone(),
                            token_type: Some(payload.token_type.clone()),
                            expires_at: Some(expires_at),
                            is_active: Some(true),
                        },
                    )
                    .await
                    .map_err(|e| AuthError::InternalError(format!("Failed to update token: {e}")))
            }
            None => {
                debug!("Creating token record for user {user_id}");
                self.repository
                    .insert(NewTokenRecord {
                        user_id,
                        access_token: payload.access_token.clone(),
                        refresh_token: payload.refresh_token.clone(),
                        token_type: payload.token_type.clone(),
                        expires_at,
                        provider: PROVIDER_GOOGLE.to_string(),
                        is_active: true,
                    })
                    .await
                    .map_err(|e| AuthError::InternalError(format!("Failed to create token: {e}")))
            }
        }
    }

    /// Current record for a user, active or not; the caller decides
    /// what "active" means in context.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<TokenRecord>, AuthError> {
        self.repository
            .get_by_user(user_id)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to look up token: {e}")))
    }

    pub async fn find_active_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<TokenRecord>, AuthError> {
        self.repository
            .get_active_by_refresh_token(refresh_token)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to look up token: {e}")))
    }

    /// Mark the user's token inactive. A no-op when there is nothing
    /// to deactivate.
    pub async fn deactivate(&self, user_id: UserId) -> Result<(), AuthError> {
        let changed = self
            .repository
            .deactivate_for_user(user_id)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to deactivate token: {e}")))?;

        if changed {
            debug!("Deactivated token record for user {user_id}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mock::InMemoryTokenRepository;

    fn payload(access: &str, refresh: Option<&str>) -> TokenPayload {
        TokenPayload {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_in: 3600,
            token_type: "Bearer".to_string(),
            id_token: None,
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_in_place() {
        let repo = Arc::new(InMemoryTokenRepository::default());
        let store = TokenStore::new(repo.clone());
        let user_id = UserId(uuid::Uuid::new_v4());

        let first = store
            .upsert(user_id, &payload("AT1", Some("RT1")))
            .await
            .unwrap();
        let second = store
            .upsert(user_id, &payload("AT2", Some("RT2")))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.access_token, "AT2");
        assert_eq!(second.refresh_token.as_deref(), Some("RT2"));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn upsert_preserves_refresh_token_when_not_rotated() {
        let repo = Arc::new(InMemoryTokenRepository::default());
        let store = TokenStore::new(repo);
        let user_id = UserId(uuid::Uuid::new_v4());

        store
            .upsert(user_id, &payload("AT1", Some("RT1")))
            .await
            .unwrap();
        let updated = store.upsert(user_id, &payload("AT2", None)).await.unwrap();

        assert_eq!(updated.access_token, "AT2");
        assert_eq!(updated.refresh_token.as_deref(), Some("RT1"));
    }

    #[tokio::test]
    async fn upsert_sets_expiry_from_payload() {
        let repo = Arc::new(InMemoryTokenRepository::default());
        let store = TokenStore::new(repo);
        let user_id = UserId(uuid::Uuid::new_v4());

        let before = Utc::now() + Duration::seconds(3600);
        let record = store
            .upsert(user_id, &payload("AT1", Some("RT1")))
            .await
            .unwrap();
        let after = Utc::now() + Duration::seconds(3600);

        assert!(record.expires_at >= before && record.expires_at <= after);
        assert!(record.is_active);
        assert_eq!(record.provider, PROVIDER_GOOGLE);
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let repo = Arc::new(InMemoryTokenRepository::default());
        let store = TokenStore::new(repo);
        let user_id = UserId(uuid::Uuid::new_v4());

        // Nothing stored yet: still fine
        store.deactivate(user_id).await.unwrap();

        store
            .upsert(user_id, &payload("AT1", Some("RT1")))
            .await
            .unwrap();
        store.deactivate(user_id).await.unwrap();
        store.deactivate(user_id).await.unwrap();

        let record = store.find_by_user(user_id).await.unwrap().unwrap();
        assert!(!record.is_active);
    }

    #[tokio::test]
    async fn inactive_tokens_are_invisible_to_refresh_lookup() {
        let repo = Arc::new(InMemoryTokenRepository::default());
        let store = TokenStore::new(repo);
        let user_id = UserId(uuid::Uuid::new_v4());

        store
            .upsert(user_id, &payload("AT1", Some("RT1")))
            .await
            .unwrap();
        assert!(store
            .find_active_by_refresh_token("RT1")
            .await
            .unwrap()
            .is_some());

        store.deactivate(user_id).await.unwrap();
        assert!(store
            .find_active_by_refresh_token("RT1")
            .await
            .unwrap()
            .is_none());
    }
}

use super::id_token::IdTokenDecoder;
use super::ports::{AuthError, NewUser, User, UserId, UserRepository};
use std::sync::Arc;
use tracing::{debug, info};

/// Maps identity-token claims to a local user record.
///
/// The uniqueness key is the provider subject (`sub`), which is stable
/// across email changes; email is stored but only a secondary
/// attribute. Existing users are returned as-is, with no profile
/// refresh.
pub struct UserResolver {
    decoder: IdTokenDecoder,
    repository: Arc<dyn UserRepository>,
}

impl UserResolver {
    pub fn new(decoder: IdTokenDecoder, repository: Arc<dyn UserRepository>) -> Self {
        Self {
            decoder,
            repository,
        }
    }

    /// Decode the identity token and find or create the local user.
    pub async fn resolve(&self, id_token: &str) -> Result<User, AuthError> {
        let claims = self.decoder.decode(id_token)?;

        let existing = self
            .repository
            .get_by_subject(&claims.sub)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to look up user: {e}")))?;

        if let Some(user) = existing {
            debug!("Found existing user for subject {}", claims.sub);
            return Ok(user);
        }

        let user = self
            .repository
            .create(NewUser {
                provider_subject: claims.sub,
                email: claims.email,
                full_name: claims.name,
                avatar_url: claims.picture,
            })
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to create user: {e}")))?;

        info!("Created new user {}", user.email);
        Ok(user)
    }

    pub async fn get_by_subject(&self, provider_subject: &str) -> Result<Option<User>, AuthError> {
        self.repository
            .get_by_subject(provider_subject)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to look up user: {e}")))
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, AuthError> {
        self.repository
            .get_by_id(id)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to look up user: {e}")))
    }

    /// Paginated listing plus total count
    pub async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), AuthError> {
        let users = self
            .repository
            .list(limit, offset)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to list users: {e}")))?;
        let total = self
            .repository
            .count()
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to count users: {e}")))?;

        Ok((users, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mock::{mock_id_token, InMemoryUserRepository};

    #[tokio::test]
    async fn resolve_creates_user_on_first_sight() {
        let repo = Arc::new(InMemoryUserRepository::default());
        let resolver = UserResolver::new(IdTokenDecoder, repo.clone());

        let token = mock_id_token("u1", "a@b.com");
        let user = resolver.resolve(&token).await.unwrap();

        assert_eq!(user.provider_subject, "u1");
        assert_eq!(user.email, "a@b.com");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn resolve_reuses_existing_user() {
        let repo = Arc::new(InMemoryUserRepository::default());
        let resolver = UserResolver::new(IdTokenDecoder, repo.clone());

        let first = resolver
            .resolve(&mock_id_token("u1", "a@b.com"))
            .await
            .unwrap();
        let second = resolver
            .resolve(&mock_id_token("u1", "a@b.com"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn resolve_keys_by_subject_not_email() {
        let repo = Arc::new(InMemoryUserRepository::default());
        let resolver = UserResolver::new(IdTokenDecoder, repo.clone());

        let original = resolver
            .resolve(&mock_id_token("u1", "a@b.com"))
            .await
            .unwrap();
        // Same subject, new email address: still the same user
        let after_email_change = resolver
            .resolve(&mock_id_token("u1", "renamed@b.com"))
            .await
            .unwrap();

        assert_eq!(original.id, after_email_change.id);
        assert_eq!(after_email_change.email, "a@b.com");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn resolve_rejects_malformed_token() {
        let repo = Arc::new(InMemoryUserRepository::default());
        let resolver = UserResolver::new(IdTokenDecoder, repo.clone());

        let result = resolver.resolve("garbage").await;

        assert!(matches!(result, Err(AuthError::DecodeError(_))));
        assert_eq!(repo.len().await, 0);
    }
}

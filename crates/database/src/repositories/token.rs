use crate::pool::DbPool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use services::auth::ports::{
    NewTokenRecord, TokenRecord, TokenRecordId, TokenRepository, TokenUpdate, UserId,
};
use tracing::debug;
use uuid::Uuid;

pub struct PgTokenRepository {
    pool: DbPool,
}

impl PgTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_token(&self, row: tokio_postgres::Row) -> Result<TokenRecord> {
        Ok(TokenRecord {
            id: TokenRecordId(row.get("id")),
            user_id: UserId(row.get("user_id")),
            access_token: row.get("access_token"),
            refresh_token: row.get("refresh_token"),
            token_type: row.get("token_type"),
            expires_at: row.get("expires_at"),
            provider: row.get("provider"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn insert(&self, record: NewTokenRecord) -> Result<TokenRecord> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        let row = client
            .query_one(
                r#"
            INSERT INTO oauth_tokens (
                id, user_id, access_token, refresh_token, token_type,
                expires_at, provider, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
                &[
                    &id,
                    &record.user_id.0,
                    &record.access_token,
                    &record.refresh_token,
                    &record.token_type,
                    &record.expires_at,
                    &record.provider,
                    &record.is_active,
                    &now,
                    &now,
                ],
            )
            .await
            .context("Failed to create token record")?;

        debug!("Created token record {} for user {}", id, record.user_id);
        self.row_to_token(row)
    }

    async fn update(&self, id: TokenRecordId, changes: TokenUpdate) -> Result<TokenRecord> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        // COALESCE keeps the stored value for every field the caller
        // left as None; in particular an unrotated refresh token
        let row = client
            .query_one(
                r#"
            UPDATE oauth_tokens SET
                access_token = COALESCE($2, access_token),
                refresh_token = COALESCE($3, refresh_token),
                token_type = COALESCE($4, token_type),
                expires_at = COALESCE($5, expires_at),
                is_active = COALESCE($6, is_active),
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
                &[
                    &id.0,
                    &changes.access_token,
                    &changes.refresh_token,
                    &changes.token_type,
                    &changes.expires_at,
                    &changes.is_active,
                    &Utc::now(),
                ],
            )
            .await
            .context("Failed to update token record")?;

        self.row_to_token(row)
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Option<TokenRecord>> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let row = client
            .query_opt(
                "SELECT * FROM oauth_tokens WHERE user_id = $1",
                &[&user_id.0],
            )
            .await
            .context("Failed to query token record")?;

        match row {
            Some(row) => Ok(Some(self.row_to_token(row)?)),
            None => Ok(None),
        }
    }

    async fn get_active_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<TokenRecord>> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let row = client
            .query_opt(
                "SELECT * FROM oauth_tokens WHERE refresh_token = $1 AND is_active = true",
                &[&refresh_token],
            )
            .await
            .context("Failed to query token record by refresh token")?;

        match row {
            Some(row) => Ok(Some(self.row_to_token(row)?)),
            None => Ok(None),
        }
    }

    async fn deactivate_for_user(&self, user_id: UserId) -> Result<bool> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let changed = client
            .execute(
                r#"
            UPDATE oauth_tokens SET is_active = false, updated_at = $2
            WHERE user_id = $1 AND is_active = true
            "#,
                &[&user_id.0, &Utc::now()],
            )
            .await
            .context("Failed to deactivate token record")?;

        Ok(changed > 0)
    }
}

use crate::pool::DbPool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use services::auth::ports::{NewUser, User, UserId, UserRepository};
use tracing::debug;
use uuid::Uuid;

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_user(&self, row: tokio_postgres::Row) -> Result<User> {
        Ok(User {
            id: UserId(row.get("id")),
            provider_subject: row.get("provider_subject"),
            email: row.get("email"),
            full_name: row.get("full_name"),
            avatar_url: row.get("avatar_url"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
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
            INSERT INTO users (id, provider_subject, email, full_name, avatar_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
                &[
                    &id,
                    &new_user.provider_subject,
                    &new_user.email,
                    &new_user.full_name,
                    &new_user.avatar_url,
                    &now,
                ],
            )
            .await
            .context("Failed to create user")?;

        debug!("Created user: {} ({})", new_user.email, id);
        self.row_to_user(row)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let row = client
            .query_opt("SELECT * FROM users WHERE id = $1", &[&id.0])
            .await
            .context("Failed to query user")?;

        match row {
            Some(row) => Ok(Some(self.row_to_user(row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_subject(&self, provider_subject: &str) -> Result<Option<User>> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let row = client
            .query_opt(
                "SELECT * FROM users WHERE provider_subject = $1",
                &[&provider_subject],
            )
            .await
            .context("Failed to query user by subject")?;

        match row {
            Some(row) => Ok(Some(self.row_to_user(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let rows = client
            .query(
                "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                &[&limit, &offset],
            )
            .await
            .context("Failed to list users")?;

        rows.into_iter().map(|row| self.row_to_user(row)).collect()
    }

    async fn count(&self) -> Result<i64> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get database connection")?;

        let row = client
            .query_one("SELECT COUNT(*) FROM users", &[])
            .await
            .context("Failed to count users")?;

        Ok(row.get(0))
    }
}

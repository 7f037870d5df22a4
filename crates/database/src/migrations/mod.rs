use crate::pool::DbPool;
use anyhow::{Context, Result};
use refinery::load_sql_migrations;
use tracing::info;

/// Apply any pending schema migrations.
///
/// The versioned SQL files under `migrations/sql` are discovered at
/// runtime relative to the working directory, so the server must be
/// started from the workspace root.
pub async fn run(pool: &DbPool) -> Result<()> {
    let mut client = pool
        .get()
        .await
        .context("Failed to check out a connection for migrations")?;

    let sql_dir = std::env::current_dir()
        .context("Failed to resolve working directory")?
        .join("crates/database/src/migrations/sql");

    let migrations = load_sql_migrations(&sql_dir)
        .with_context(|| format!("Failed to read migration files in {sql_dir:?}"))?;

    let report = refinery::Runner::new(&migrations)
        .run_async(&mut **client)
        .await
        .context("Migration run failed")?;

    for migration in report.applied_migrations() {
        info!("Applied migration {}", migration.name());
    }

    info!("Schema is up to date");
    Ok(())
}

use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, sqlx::PgPool};
use tracing::info;

/// Connects sea-orm and the session store pool, applying pending migrations
/// first when `run_migrations` is set.
pub async fn setup_database(
    db_url: &str,
    run_migrations: bool,
) -> anyhow::Result<(DatabaseConnection, PgPool)> {
    let db = Database::connect(db_url)
        .await
        .context("Cannot connect to db")?;

    if run_migrations {
        Migrator::up(&db, None)
            .await
            .context("Failed to apply migrations")?;
        info!("Migrations applied");
    }

    let pool = PgPool::connect(db_url).await?;

    Ok((db, pool))
}

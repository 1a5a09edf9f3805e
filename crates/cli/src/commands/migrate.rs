//! Database migration command.
//!
//! Runs the storefront SQL migrations and then the session store's own
//! migration (tower-sessions manages its table itself).
//!
//! # Environment Variables
//!
//! - `AURELIA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use super::{CommandError, connect};

/// Run all storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Running session store migration...");
    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;

    info!("Migrations complete!");
    Ok(())
}

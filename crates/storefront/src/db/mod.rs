//! Database operations for the storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `users` - Accounts and password hashes
//! - `api_token` - Bearer token digests
//! - `product` / `variant` - Catalog (seeded via the CLI)
//! - `cart_item` - Authenticated users' cart lines
//! - `orders` / `order_item` - Finalized order snapshots
//! - `tower_sessions.session` - Guest session state (created by the
//!   session store's own migration)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p aurelia-cli -- migrate
//! ```

mod carts;
mod orders;
mod products;
mod users;

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A stored value could not be interpreted as its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::carrier::{CarrierClient, CarrierError};
use crate::services::checkout::FinalizeRegistry;
use crate::services::payment::{PaymentClient, PaymentError};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("carrier client error: {0}")]
    Carrier(#[from] CarrierError),
    #[error("payment client error: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    carrier: CarrierClient,
    payments: PaymentClient,
    finalizer: FinalizeRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if an API client cannot be constructed.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let carrier = CarrierClient::new(&config.carrier)?;
        let payments = PaymentClient::new(&config.payment)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                carrier,
                payments,
                finalizer: FinalizeRegistry::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the carrier address-validation client.
    #[must_use]
    pub fn carrier(&self) -> &CarrierClient {
        &self.inner.carrier
    }

    /// Get a reference to the payment provider client.
    #[must_use]
    pub fn payments(&self) -> &PaymentClient {
        &self.inner.payments
    }

    /// Get a reference to the order-finalization guard registry.
    #[must_use]
    pub fn finalizer(&self) -> &FinalizeRegistry {
        &self.inner.finalizer
    }
}

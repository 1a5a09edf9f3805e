//! Cart stores: one interface, two backings.
//!
//! A guest's cart is persisted through the [`KvStore`] port (the cookie
//! session in production); an authenticated user's cart is persisted in
//! `PostgreSQL`. Both expose the identical [`CartStore`] contract so route
//! handlers are agnostic to which one they hold.

use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use aurelia_core::UserId;

use crate::db::{CartRepository, RepositoryError};
use crate::models::cart::{Cart, CartError, CartItem, LineKey};
use crate::models::session_keys;

use super::kv::{KvError, KvStore};

/// Errors from cart store operations.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// The mutation violated a cart rule.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The guest key-value backend failed.
    #[error(transparent)]
    Kv(#[from] KvError),

    /// The database backend failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The cart contract shared by guest and user backings.
///
/// Every mutation returns the resulting cart so callers can derive the new
/// subtotal and item count without a second round-trip.
pub trait CartStore {
    /// Load the current cart.
    fn get(&self) -> impl Future<Output = Result<Cart, CartStoreError>> + Send;

    /// Add a line; same-key lines have their quantities summed.
    fn add(&self, item: CartItem) -> impl Future<Output = Result<Cart, CartStoreError>> + Send;

    /// Remove the line with the given key.
    fn remove(&self, key: LineKey) -> impl Future<Output = Result<Cart, CartStoreError>> + Send;

    /// Set a line's quantity; 0 removes the line.
    fn update_quantity(
        &self,
        key: LineKey,
        quantity: u32,
    ) -> impl Future<Output = Result<Cart, CartStoreError>> + Send;

    /// Fold another cart in, summing same-key quantities.
    fn merge(&self, other: Cart) -> impl Future<Output = Result<Cart, CartStoreError>> + Send;

    /// Drop every line.
    fn clear(&self) -> impl Future<Output = Result<(), CartStoreError>> + Send;
}

// =============================================================================
// Guest cart (key-value port)
// =============================================================================

/// Cart store for unauthenticated visitors, persisted through [`KvStore`].
#[derive(Debug)]
pub struct GuestCartStore<K> {
    kv: K,
}

impl<K: KvStore + Sync> GuestCartStore<K> {
    /// Create a store over the given backend.
    pub const fn new(kv: K) -> Self {
        Self { kv }
    }

    async fn load(&self) -> Result<Cart, CartStoreError> {
        match self.kv.read(session_keys::GUEST_CART).await? {
            Some(value) => Ok(serde_json::from_value(value).map_err(KvError::Serde)?),
            None => Ok(Cart::new()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStoreError> {
        let value: Value = serde_json::to_value(cart).map_err(KvError::Serde)?;
        self.kv.write(session_keys::GUEST_CART, value).await?;
        Ok(())
    }
}

impl<K: KvStore + Sync> CartStore for GuestCartStore<K> {
    async fn get(&self) -> Result<Cart, CartStoreError> {
        self.load().await
    }

    async fn add(&self, item: CartItem) -> Result<Cart, CartStoreError> {
        let mut cart = self.load().await?;
        cart.add(item)?;
        self.save(&cart).await?;
        Ok(cart)
    }

    async fn remove(&self, key: LineKey) -> Result<Cart, CartStoreError> {
        let mut cart = self.load().await?;
        cart.remove(key);
        self.save(&cart).await?;
        Ok(cart)
    }

    async fn update_quantity(&self, key: LineKey, quantity: u32) -> Result<Cart, CartStoreError> {
        let mut cart = self.load().await?;
        cart.update_quantity(key, quantity);
        self.save(&cart).await?;
        Ok(cart)
    }

    async fn merge(&self, other: Cart) -> Result<Cart, CartStoreError> {
        let mut cart = self.load().await?;
        cart.merge(other);
        self.save(&cart).await?;
        Ok(cart)
    }

    async fn clear(&self) -> Result<(), CartStoreError> {
        self.kv.clear(session_keys::GUEST_CART).await?;
        Ok(())
    }
}

// =============================================================================
// User cart (PostgreSQL)
// =============================================================================

/// Cart store for an authenticated user, persisted in `PostgreSQL`.
///
/// The database is the source of truth; every mutation re-reads the rows so
/// the returned cart reflects exactly what was persisted.
#[derive(Debug, Clone, Copy)]
pub struct UserCartStore<'a> {
    pool: &'a PgPool,
    user_id: UserId,
}

impl<'a> UserCartStore<'a> {
    /// Create a store for the given user.
    #[must_use]
    pub const fn new(pool: &'a PgPool, user_id: UserId) -> Self {
        Self { pool, user_id }
    }

    const fn repo(&self) -> CartRepository<'a> {
        CartRepository::new(self.pool)
    }
}

impl CartStore for UserCartStore<'_> {
    async fn get(&self) -> Result<Cart, CartStoreError> {
        let items = self.repo().fetch_items(self.user_id).await?;
        Ok(Cart::from_items(items))
    }

    async fn add(&self, item: CartItem) -> Result<Cart, CartStoreError> {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity.into());
        }
        self.repo().upsert_add(self.user_id, &item).await?;
        self.get().await
    }

    async fn remove(&self, key: LineKey) -> Result<Cart, CartStoreError> {
        self.repo().delete_item(self.user_id, key).await?;
        self.get().await
    }

    async fn update_quantity(&self, key: LineKey, quantity: u32) -> Result<Cart, CartStoreError> {
        if quantity == 0 {
            self.repo().delete_item(self.user_id, key).await?;
        } else {
            self.repo().set_quantity(self.user_id, key, quantity).await?;
        }
        self.get().await
    }

    async fn merge(&self, other: Cart) -> Result<Cart, CartStoreError> {
        self.repo().merge_items(self.user_id, other.items()).await?;
        self.get().await
    }

    async fn clear(&self) -> Result<(), CartStoreError> {
        self.repo().clear(self.user_id).await?;
        Ok(())
    }
}

// =============================================================================
// Request-scoped dispatch
// =============================================================================

/// The cart store backing the current request.
///
/// Routes resolve this once from the request's auth state and then talk to
/// the [`CartStore`] contract without caring which side they got.
pub enum ActiveCart<'a> {
    /// Unauthenticated request: session-backed guest cart.
    Guest(GuestCartStore<super::kv::SessionKv>),
    /// Bearer-authenticated request: database-backed user cart.
    User(UserCartStore<'a>),
}

impl<'a> ActiveCart<'a> {
    /// Pick the store for a request.
    #[must_use]
    pub fn for_request(
        pool: &'a PgPool,
        session: tower_sessions::Session,
        user_id: Option<UserId>,
    ) -> Self {
        match user_id {
            Some(id) => Self::User(UserCartStore::new(pool, id)),
            None => Self::Guest(GuestCartStore::new(super::kv::SessionKv::new(session))),
        }
    }
}

impl CartStore for ActiveCart<'_> {
    async fn get(&self) -> Result<Cart, CartStoreError> {
        match self {
            Self::Guest(store) => store.get().await,
            Self::User(store) => store.get().await,
        }
    }

    async fn add(&self, item: CartItem) -> Result<Cart, CartStoreError> {
        match self {
            Self::Guest(store) => store.add(item).await,
            Self::User(store) => store.add(item).await,
        }
    }

    async fn remove(&self, key: LineKey) -> Result<Cart, CartStoreError> {
        match self {
            Self::Guest(store) => store.remove(key).await,
            Self::User(store) => store.remove(key).await,
        }
    }

    async fn update_quantity(&self, key: LineKey, quantity: u32) -> Result<Cart, CartStoreError> {
        match self {
            Self::Guest(store) => store.update_quantity(key, quantity).await,
            Self::User(store) => store.update_quantity(key, quantity).await,
        }
    }

    async fn merge(&self, other: Cart) -> Result<Cart, CartStoreError> {
        match self {
            Self::Guest(store) => store.merge(other).await,
            Self::User(store) => store.merge(other).await,
        }
    }

    async fn clear(&self) -> Result<(), CartStoreError> {
        match self {
            Self::Guest(store) => store.clear().await,
            Self::User(store) => store.clear().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::cart::tests::{item, usd};
    use crate::services::kv::MemoryKv;

    fn store() -> GuestCartStore<MemoryKv> {
        GuestCartStore::new(MemoryKv::new())
    }

    #[tokio::test]
    async fn test_guest_store_starts_empty() {
        let cart = store().get().await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_guest_store_persists_across_reads() {
        let store = store();
        store.add(item(1, 1, 2, "100")).await.unwrap();
        let cart = store.get().await.unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal().unwrap(), usd("200"));
    }

    #[tokio::test]
    async fn test_guest_store_add_sums_same_key() {
        let store = store();
        store.add(item(1, 1, 1, "100")).await.unwrap();
        let cart = store.add(item(1, 1, 2, "100")).await.unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_guest_store_zero_quantity_rejected_and_not_persisted() {
        let store = store();
        let err = store.add(item(1, 1, 0, "100")).await.unwrap_err();
        assert!(matches!(
            err,
            CartStoreError::Cart(CartError::ZeroQuantity)
        ));
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guest_store_update_zero_removes() {
        let store = store();
        store.add(item(1, 1, 2, "100")).await.unwrap();
        let cart = store
            .update_quantity(item(1, 1, 2, "100").key(), 0)
            .await
            .unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_guest_store_merge_then_clear() {
        let store = store();
        store.add(item(1, 1, 1, "100")).await.unwrap();

        let mut incoming = Cart::new();
        incoming.add(item(1, 1, 2, "100")).unwrap();
        incoming.add(item(2, 2, 1, "50")).unwrap();

        let merged = store.merge(incoming).await.unwrap();
        assert_eq!(merged.items()[0].quantity, 3);
        assert_eq!(merged.items().len(), 2);

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_empty());
    }
}

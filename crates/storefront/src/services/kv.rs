//! Key-value persistence port for guest client state.
//!
//! Guest state (cart, checkout address) lives behind this small port rather
//! than directly on the cookie session, so tests can swap in an in-memory
//! backend and the storage choice stays in one place.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;
use tower_sessions::Session;

/// Errors from the key-value port.
#[derive(Debug, Error)]
pub enum KvError {
    /// The session backend failed.
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A stored value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A namespaced JSON key-value store.
pub trait KvStore {
    /// Read the value at `key`, if any.
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<Value>, KvError>> + Send;

    /// Write `value` at `key`, replacing any existing value.
    fn write(&self, key: &str, value: Value) -> impl Future<Output = Result<(), KvError>> + Send;

    /// Remove the value at `key`. Removing a missing key is not an error.
    fn clear(&self, key: &str) -> impl Future<Output = Result<(), KvError>> + Send;
}

/// Production backend: the shopper's cookie session.
#[derive(Debug, Clone)]
pub struct SessionKv {
    session: Session,
}

impl SessionKv {
    /// Wrap a request session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl KvStore for SessionKv {
    async fn read(&self, key: &str) -> Result<Option<Value>, KvError> {
        Ok(self.session.get::<Value>(key).await?)
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), KvError> {
        self.session.insert(key, value).await?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), KvError> {
        self.session.remove::<Value>(key).await?;
        Ok(())
    }
}

/// In-memory backend for tests.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: Mutex<HashMap<String, Value>>,
}

impl MemoryKv {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryKv {
    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KvStore for MemoryKv {
    async fn read(&self, key: &str) -> Result<Option<Value>, KvError> {
        Ok(self.map().get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), KvError> {
        self.map().insert(key.to_string(), value);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), KvError> {
        self.map().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_kv_roundtrip() {
        let kv = MemoryKv::new();
        assert!(kv.read("missing").await.unwrap().is_none());

        kv.write("cart", json!({"items": []})).await.unwrap();
        assert_eq!(
            kv.read("cart").await.unwrap(),
            Some(json!({"items": []}))
        );

        kv.clear("cart").await.unwrap();
        assert!(kv.read("cart").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_kv_clear_missing_key_is_ok() {
        let kv = MemoryKv::new();
        assert!(kv.clear("never-written").await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_kv_write_replaces() {
        let kv = MemoryKv::new();
        kv.write("k", json!(1)).await.unwrap();
        kv.write("k", json!(2)).await.unwrap();
        assert_eq!(kv.read("k").await.unwrap(), Some(json!(2)));
    }
}

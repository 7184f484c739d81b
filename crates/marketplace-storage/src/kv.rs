//! Key-value store trait with JSON helpers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::StorageResult;

/// Asynchronous string-keyed, string-valued store.
///
/// Values are opaque strings; callers that want structured data go through
/// [`KeyValueStoreExt`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Remove the value under `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key).await
    }
}

/// Typed JSON access on top of any [`KeyValueStore`].
///
/// # Example
///
/// ```rust,ignore
/// store.set_json("@CustomMarketplace:products", &items).await?;
/// let items: Option<Vec<LineItem>> = store.get_json("@CustomMarketplace:products").await?;
/// ```
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Read and deserialize the value under `key`.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`.
    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Helper to build storage keys with namespacing.
///
/// # Example
///
/// ```rust
/// let key = marketplace_storage::storage_key!("@CustomMarketplace", "products");
/// assert_eq!(key, "@CustomMarketplace:products");
/// ```
#[macro_export]
macro_rules! storage_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: String,
        count: i64,
    }

    #[test]
    fn test_storage_key_joins_parts() {
        assert_eq!(storage_key!("@CustomMarketplace", "products"), "@CustomMarketplace:products");
        assert_eq!(storage_key!("cart", "user", 42), "cart:user:42");
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        let entries = vec![Entry { id: "a".into(), count: 2 }];

        store.set_json("k", &entries).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), r#"[{"id":"a","count":2}]"#);

        let loaded: Option<Vec<Entry>> = store.get_json("k").await.unwrap();
        assert_eq!(loaded, Some(entries));

        let missing: Option<Vec<Entry>> = store.get_json("other").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_json_rejects_wrong_shape() {
        let store = MemoryStore::new();
        store.set("k", "{\"not\":\"a list\"}".to_string()).await.unwrap();

        let result: StorageResult<Option<Vec<Entry>>> = store.get_json("k").await;
        assert!(matches!(result, Err(crate::StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_arc_store_shares_state() {
        let store = Arc::new(MemoryStore::new());
        let other = Arc::clone(&store);

        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(other.get("k").await.unwrap().as_deref(), Some("v"));
    }
}

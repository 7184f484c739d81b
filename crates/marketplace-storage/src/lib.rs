//! Async key-value persistence for the marketplace app.
//!
//! A string-keyed, string-valued store with JSON helpers, in the shape the
//! mobile app's local storage exposes: `get` and `set` by key.
//!
//! # Example
//!
//! ```rust,ignore
//! use marketplace_storage::prelude::*;
//!
//! let store = FileStore::open("data/cart.json").await?;
//! let key = storage_key!("@CustomMarketplace", "products");
//!
//! // Store a value
//! store.set_json(&key, &items).await?;
//!
//! // Retrieve a value
//! let items: Option<Vec<LineItem>> = store.get_json(&key).await?;
//! ```

mod error;
mod file;
mod kv;
mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use kv::{KeyValueStore, KeyValueStoreExt};
pub use memory::MemoryStore;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::storage_key;
    pub use crate::{FileStore, KeyValueStore, KeyValueStoreExt, MemoryStore, StorageError};
}

//! Persistent shopping cart state for the marketplace app.
//!
//! This crate provides:
//!
//! - **Cart**: ordered line items keyed by product id, with add / increment /
//!   decrement transitions
//! - **CartStore**: the session's authoritative cart, hydrated once from a
//!   [`KeyValueStore`](marketplace_storage::KeyValueStore) and written back
//!   wholesale after every mutation
//! - **CartConfig**: snapshot key and failure handling, loaded from TOML or JSON
//!
//! # Example
//!
//! ```rust,ignore
//! use marketplace_cart::prelude::*;
//! use marketplace_storage::FileStore;
//!
//! let config = CartConfig::load("cart.toml")?;
//! let backend = FileStore::open("data/cart.json").await?;
//! let store = CartStore::open(backend, config).await?;
//!
//! // UI layers get the handle and watch for changes
//! let mut changes = store.subscribe()?;
//!
//! store.add_to_cart(NewLineItem::new("p1", "Mug", "https://img/p1.png", 12.0)).await?;
//! store.decrement(&ProductId::new("p1")).await?;
//! ```

pub mod cart;
pub mod config;
pub mod error;
pub mod ids;
pub mod store;

pub use cart::{Cart, LineItem, NewLineItem};
pub use config::{CartConfig, FailurePolicy, PersistenceConfig, StorageConfig};
pub use error::CartError;
pub use ids::ProductId;
pub use store::CartStore;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cart::{Cart, LineItem, NewLineItem};
    pub use crate::config::{CartConfig, FailurePolicy, PersistenceConfig, StorageConfig};
    pub use crate::error::CartError;
    pub use crate::ids::ProductId;
    pub use crate::store::CartStore;
}

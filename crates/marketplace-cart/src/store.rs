//! The cart store: in-memory cart mirrored to durable storage.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use marketplace_storage::{FileStore, KeyValueStore, KeyValueStoreExt, StorageError};
use tokio::sync::{watch, Mutex};

use crate::cart::{Cart, NewLineItem};
use crate::config::{CartConfig, FailurePolicy};
use crate::error::CartError;
use crate::ids::ProductId;

const SCOPE_PENDING: u8 = 0;
const SCOPE_HYDRATING: u8 = 1;
const SCOPE_ACTIVE: u8 = 2;
const SCOPE_CLOSED: u8 = 3;

/// Authoritative cart state for one app session.
///
/// Mutations update memory synchronously, in call order, then write the
/// whole cart to the durable store under a single key. Each write runs on a
/// spawned task behind one writer lock and stores the newest cart at the
/// time it gets the lock; writes already covered by a newer one are skipped.
/// The durable snapshot always ends on the latest mutation, even if the
/// caller stops waiting.
///
/// The store is only usable between [`hydrate`](Self::hydrate) and
/// [`close`](Self::close); anything else is a [`CartError::Usage`].
/// Clones share the same state.
///
/// # Example
///
/// ```rust,ignore
/// let store = CartStore::open(FileStore::open("data/cart.json").await?, CartConfig::default()).await?;
/// store.add_to_cart(NewLineItem::new("p1", "Mug", "https://img/p1.png", 12.0)).await?;
/// store.increment(&"p1".into()).await?;
/// assert_eq!(store.items()?.item_count(), 2);
/// ```
pub struct CartStore<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    backend: S,
    config: CartConfig,
    key: String,
    scope: AtomicU8,
    /// Current cart. The watch lock orders mutations.
    state: watch::Sender<Cart>,
    revision: AtomicU64,
    /// Revision of the last snapshot written.
    written: Mutex<u64>,
}

impl<S> Clone for CartStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore + 'static> CartStore<S> {
    /// Create an inactive store over `backend`.
    ///
    /// Call [`hydrate`](Self::hydrate) before use.
    pub fn new(backend: S, config: CartConfig) -> Self {
        let key = config.storage.key();
        let (state, _) = watch::channel(Cart::new());
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                key,
                scope: AtomicU8::new(SCOPE_PENDING),
                state,
                revision: AtomicU64::new(0),
                written: Mutex::new(0),
            }),
        }
    }

    /// Create a store and hydrate it from `backend`.
    pub async fn open(backend: S, config: CartConfig) -> Result<Self, CartError> {
        let store = Self::new(backend, config);
        store.hydrate().await?;
        Ok(store)
    }

    /// Load the stored snapshot, if any, and activate the store.
    ///
    /// Runs once; a second call is a usage error. Read and parse failures
    /// follow the configured [`FailurePolicy`].
    pub async fn hydrate(&self) -> Result<(), CartError> {
        if self
            .inner
            .scope
            .compare_exchange(SCOPE_PENDING, SCOPE_HYDRATING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CartError::Usage("hydrate called more than once".to_string()));
        }

        let loaded = match self.load_snapshot().await {
            Ok(loaded) => loaded,
            Err(e) => {
                // A failed strict hydration leaves the store unusable.
                self.inner.scope.store(SCOPE_CLOSED, Ordering::Release);
                return Err(e);
            }
        };

        match loaded {
            Some(cart) => {
                tracing::info!(key = %self.inner.key, items = cart.len(), "hydrated cart");
                // Mutations can't run before activation, so this replaces the empty cart.
                self.inner.state.send_replace(cart);
            }
            None => tracing::info!(key = %self.inner.key, "no stored cart, starting empty"),
        }

        // A close() during hydration wins.
        let _ = self.inner.scope.compare_exchange(
            SCOPE_HYDRATING,
            SCOPE_ACTIVE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<Cart>, CartError> {
        let policy = &self.inner.config.persistence;

        let raw = match self.inner.backend.get(&self.inner.key).await {
            Ok(raw) => raw,
            Err(e) => {
                return tolerate(policy.read_failure, CartError::Persistence(e), "read cart snapshot")
                    .map(|()| None)
            }
        };

        // The app treats an empty value the same as a missing one.
        let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
            return Ok(None);
        };

        match serde_json::from_str::<Cart>(&raw) {
            Ok(cart) => Ok(Some(cart)),
            Err(e) => tolerate(policy.malformed_snapshot, e.into(), "parse cart snapshot")
                .map(|()| None),
        }
    }

    /// End the store's active scope.
    pub fn close(&self) {
        self.inner.scope.store(SCOPE_CLOSED, Ordering::Release);
    }

    /// Check if the store is between hydration and close.
    pub fn is_active(&self) -> bool {
        self.inner.scope.load(Ordering::Acquire) == SCOPE_ACTIVE
    }

    fn ensure_active(&self) -> Result<(), CartError> {
        match self.inner.scope.load(Ordering::Acquire) {
            SCOPE_ACTIVE => Ok(()),
            SCOPE_PENDING | SCOPE_HYDRATING => Err(CartError::Usage(
                "cart store accessed before hydration".to_string(),
            )),
            _ => Err(CartError::Usage("cart store accessed after close".to_string())),
        }
    }

    /// Current cart contents.
    pub fn items(&self) -> Result<Cart, CartError> {
        self.ensure_active()?;
        Ok(self.inner.state.borrow().clone())
    }

    /// Receive the latest cart whenever it changes.
    pub fn subscribe(&self) -> Result<watch::Receiver<Cart>, CartError> {
        self.ensure_active()?;
        Ok(self.inner.state.subscribe())
    }

    /// The key the snapshot is stored under.
    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    /// Add a product, or bump its quantity and refresh its fields if it is
    /// already in the cart.
    pub async fn add_to_cart(&self, item: NewLineItem) -> Result<(), CartError> {
        let id = item.id.clone();
        self.mutate("add_to_cart", &id, move |cart| cart.add(item)).await
    }

    /// Increase the quantity of `id` by one. Unknown ids leave the cart as is.
    pub async fn increment(&self, id: &ProductId) -> Result<(), CartError> {
        self.mutate("increment", id, |cart| cart.increment(id)).await
    }

    /// Decrease the quantity of `id` by one, removing it at zero.
    pub async fn decrement(&self, id: &ProductId) -> Result<(), CartError> {
        self.mutate("decrement", id, |cart| cart.decrement(id)).await
    }

    async fn mutate<F>(&self, op: &'static str, id: &ProductId, f: F) -> Result<(), CartError>
    where
        F: FnOnce(&mut Cart) -> Result<bool, CartError>,
    {
        self.ensure_active()?;

        let revision = self.apply(f)?;
        tracing::debug!(op, id = %id, revision, "applied cart mutation");

        // The write runs on its own task so dropping this future can't lose it.
        let store = self.clone();
        tokio::spawn(async move { store.persist(revision).await })
            .await
            .map_err(|e| CartError::Persistence(StorageError::Backend(e.to_string())))?
    }

    /// Apply `f` to the in-memory cart and stamp the result with a revision.
    ///
    /// Runs entirely under the watch lock, before any await point.
    fn apply<F>(&self, f: F) -> Result<u64, CartError>
    where
        F: FnOnce(&mut Cart) -> Result<bool, CartError>,
    {
        let mut outcome = None;
        self.inner.state.send_if_modified(|cart| match f(cart) {
            Ok(changed) => {
                outcome = Some(Ok(self.inner.revision.fetch_add(1, Ordering::AcqRel) + 1));
                changed
            }
            Err(e) => {
                outcome = Some(Err(e));
                false
            }
        });
        outcome.unwrap_or_else(|| Err(CartError::Usage("cart state unavailable".to_string())))
    }

    /// Snapshot the current cart and its revision.
    ///
    /// The revision only moves under the watch write lock, so reading it
    /// while holding a borrow gives a consistent pair.
    fn latest(&self) -> (u64, Cart) {
        let cart = self.inner.state.borrow();
        (self.inner.revision.load(Ordering::Acquire), cart.clone())
    }

    /// Write the latest cart unless a write covering `revision` already landed.
    async fn persist(&self, revision: u64) -> Result<(), CartError> {
        let mut written = self.inner.written.lock().await;
        if *written >= revision {
            tracing::debug!(revision, latest = *written, "cart already stored, skipping write");
            return Ok(());
        }

        let (latest, snapshot) = self.latest();
        match self.inner.backend.set_json(&self.inner.key, &snapshot).await {
            Ok(()) => {
                tracing::debug!(revision = latest, items = snapshot.len(), "stored cart snapshot");
                *written = latest;
                Ok(())
            }
            Err(e) => tolerate(
                self.inner.config.persistence.write_failure,
                CartError::Persistence(e),
                "write cart snapshot",
            ),
        }
    }
}

impl CartStore<FileStore> {
    /// Open a file-backed store at `config.storage.path` and hydrate it.
    pub async fn open_file(config: CartConfig) -> Result<Self, CartError> {
        let path = config
            .storage
            .path
            .clone()
            .ok_or_else(|| CartError::Config("storage.path is not set".to_string()))?;
        let backend = FileStore::open(&path).await?;
        Self::open(backend, config).await
    }
}

/// Log or return `err` according to `policy`.
fn tolerate(policy: FailurePolicy, err: CartError, action: &str) -> Result<(), CartError> {
    match policy {
        FailurePolicy::Log => {
            tracing::warn!(error = %err, "failed to {action}, continuing with in-memory cart");
            Ok(())
        }
        FailurePolicy::Propagate => Err(err),
    }
}

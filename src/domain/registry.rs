//! Live observable storage with per-entry fine-grained locking.
//!
//! [`ObservableRegistry`] stores every live query observable in a
//! `HashMap` where each entry is individually protected by a
//! [`tokio::sync::Mutex`], plus a side table mapping backend subscription
//! keys to observable identifiers for push event demultiplexing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock};

use crate::domain::observable::Observable;
use crate::domain::observable_id::ObservableId;
use crate::domain::subscription_key::SubscriptionKey;
use crate::error::BridgeError;

/// Shared handle to one registry entry.
pub type ObservableRef = Arc<Mutex<Observable>>;

/// Central store for all live query observables.
///
/// Identifier allocation is a monotonic counter; an identifier is unique
/// for the registry's lifetime and never reused. The key side table
/// realises the demultiplexing lookup: a bound subscription key maps to
/// exactly one observable at any time.
///
/// # Concurrency
///
/// - Lookups on different observables are concurrent.
/// - Mutation of one observable is serialized by its entry lock.
/// - `bind` is the only operation nesting an entry lock inside the key
///   table lock; no path nests the key table inside an entry lock.
#[derive(Debug)]
pub struct ObservableRegistry {
    next_id: AtomicU64,
    observables: RwLock<HashMap<ObservableId, ObservableRef>>,
    keys: RwLock<HashMap<SubscriptionKey, ObservableId>>,
}

impl ObservableRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            observables: RwLock::new(HashMap::new()),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates a fresh identifier and stores a new, empty-subscription
    /// observable.
    pub async fn create(&self) -> (ObservableId, ObservableRef) {
        let id = ObservableId::from_u64(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(Mutex::new(Observable::new(id)));
        self.observables
            .write()
            .await
            .insert(id, Arc::clone(&entry));
        (id, entry)
    }

    /// Returns the entry for the given identifier, if it is still live.
    pub async fn get(&self, id: ObservableId) -> Option<ObservableRef> {
        self.observables.read().await.get(&id).cloned()
    }

    /// Associates a backend subscription key with an existing observable.
    ///
    /// Binding the same key to the same observable again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] if the observable has been
    /// removed or already disposed (the caller then owns releasing the
    /// orphaned key), and [`BridgeError::KeyConflict`] if the key is
    /// claimed by a different observable or the observable is bound to a
    /// different key.
    pub async fn bind(&self, id: ObservableId, key: SubscriptionKey) -> Result<(), BridgeError> {
        let Some(entry) = self.get(id).await else {
            return Err(BridgeError::NotFound(id));
        };

        let mut keys = self.keys.write().await;
        if let Some(owner) = keys.get(&key) {
            if *owner == id {
                return Ok(());
            }
            return Err(BridgeError::KeyConflict(format!(
                "key {key} is already claimed by observable {owner}"
            )));
        }

        let mut observable = entry.lock().await;
        if observable.is_disposed() {
            return Err(BridgeError::NotFound(id));
        }
        observable.bind_key(key.clone())?;
        keys.insert(key, id);
        Ok(())
    }

    /// Resolves a push event's subscription key to its observable.
    ///
    /// This is the demultiplexing lookup run for every event on the
    /// shared push channel. `None` means the key is stale.
    pub async fn resolve(&self, key: &SubscriptionKey) -> Option<(ObservableId, ObservableRef)> {
        let id = { self.keys.read().await.get(key).copied()? };
        let entry = self.observables.read().await.get(&id).cloned()?;
        Some((id, entry))
    }

    /// Removes an observable and its key mapping, returning the entry.
    pub async fn remove(&self, id: ObservableId) -> Option<ObservableRef> {
        let entry = { self.observables.write().await.remove(&id) }?;
        let key = { entry.lock().await.key().cloned() };
        if let Some(key) = key {
            self.keys.write().await.remove(&key);
        }
        Some(entry)
    }

    /// Empties the registry, returning every live entry for teardown.
    pub async fn drain(&self) -> Vec<(ObservableId, ObservableRef)> {
        let drained: Vec<_> = self.observables.write().await.drain().collect();
        self.keys.write().await.clear();
        drained
    }

    /// Returns the number of live observables.
    pub async fn len(&self) -> usize {
        self.observables.read().await.len()
    }

    /// Returns `true` if no observable is live.
    pub async fn is_empty(&self) -> bool {
        self.observables.read().await.is_empty()
    }
}

impl Default for ObservableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

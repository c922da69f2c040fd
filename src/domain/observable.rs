//! Mutable state of one in-flight or streaming query.
//!
//! An [`Observable`] is owned by the [`super::ObservableRegistry`] behind a
//! per-entry lock; the subscription manager and lifecycle controller
//! reference it, never duplicate it. All mutation goes through the methods
//! here so the disposed gate and key immutability hold everywhere.

use crate::domain::observable_id::ObservableId;
use crate::domain::observer::{ExecutionResult, Observer};
use crate::domain::subscription_key::SubscriptionKey;
use crate::domain::subscriptions::{SubscriptionHandle, SubscriptionSet};
use crate::error::BridgeError;

/// One logical query's result stream state.
///
/// Created in the pending state on fetch, optionally bound to a backend
/// subscription key when the first reply marks the query as streaming,
/// and disposed exactly once.
#[derive(Debug)]
pub struct Observable {
    id: ObservableId,
    key: Option<SubscriptionKey>,
    disposed: bool,
    subscriptions: SubscriptionSet,
}

impl Observable {
    /// Creates a pending observable with no subscriptions.
    pub(crate) fn new(id: ObservableId) -> Self {
        Self {
            id,
            key: None,
            disposed: false,
            subscriptions: SubscriptionSet::new(),
        }
    }

    /// Returns the observable's identifier.
    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.id
    }

    /// Returns the bound subscription key, if the query is streaming.
    #[must_use]
    pub fn key(&self) -> Option<&SubscriptionKey> {
        self.key.as_ref()
    }

    /// Returns `true` once the observable has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns the number of attached subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Attaches an observer, returning its detach handle.
    ///
    /// Subscribing to an already-disposed observable is accepted; the
    /// observer is recorded but the disposed gate keeps it from ever
    /// receiving a delivery.
    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionHandle {
        self.subscriptions.subscribe(observer)
    }

    /// Detaches one subscription.
    ///
    /// Returns `true` if the removal emptied a previously non-empty set;
    /// the caller owns the resulting disposal.
    pub fn detach(&mut self, handle: SubscriptionHandle) -> bool {
        self.subscriptions.detach(handle)
    }

    /// Binds the backend subscription key.
    ///
    /// Binding the same key again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::KeyConflict`] if a different key is already
    /// bound; a key, once assigned, is immutable.
    pub fn bind_key(&mut self, key: SubscriptionKey) -> Result<(), BridgeError> {
        match &self.key {
            None => {
                self.key = Some(key);
                Ok(())
            }
            Some(existing) if *existing == key => Ok(()),
            Some(existing) => Err(BridgeError::KeyConflict(format!(
                "observable {} is bound to {existing}, refusing rebind to {key}",
                self.id
            ))),
        }
    }

    /// Marks the observable disposed.
    ///
    /// Returns `true` only on the first call; disposal is idempotent and
    /// a second invocation is a no-op.
    pub fn mark_disposed(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        true
    }

    /// Fans one result out to the attached subscriptions.
    ///
    /// No-op on a disposed observable. Returns `true` if single-shot
    /// auto-detaches emptied a previously non-empty set.
    pub fn fan_out_next(&mut self, result: &ExecutionResult) -> bool {
        if self.disposed {
            return false;
        }
        self.subscriptions.fan_out_next(result)
    }

    /// Fans an execution failure out to streaming observers.
    ///
    /// No-op on a disposed observable.
    pub fn fan_out_error(&mut self, error: &ExecutionResult) {
        if self.disposed {
            return;
        }
        self.subscriptions.fan_out_error(error);
    }

    /// Fans `complete` out to streaming observers and clears the set.
    ///
    /// No-op on a disposed observable (returns `false`); otherwise returns
    /// `true` unconditionally.
    pub fn fan_out_complete(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.subscriptions.fan_out_complete()
    }
}

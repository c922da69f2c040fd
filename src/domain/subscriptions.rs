//! Per-observable subscription table with fan-out delivery.
//!
//! Tracks the observers attached to one observable, assigns per-observable
//! handles, and delivers events to every attached subscription in
//! insertion order. Single-shot observers are detached automatically after
//! their first delivery.

use crate::domain::observer::{ExecutionResult, Observer};

/// Handle identifying one attached subscription within its observable.
///
/// Unique per observable; allocated from a per-observable counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One attached observer with its handle.
#[derive(Debug)]
struct SubscriptionEntry {
    handle: SubscriptionHandle,
    observer: Observer,
}

/// Ordered set of subscriptions attached to one observable.
///
/// Insertion order is delivery order for fan-out. The set reports the
/// non-empty-to-empty transition from every mutation so the lifecycle
/// controller can run its emptied path exactly once per emptying;
/// re-subscribing and re-emptying reports the transition again.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    entries: Vec<SubscriptionEntry>,
    next_handle: u64,
}

impl SubscriptionSet {
    /// Creates an empty subscription set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observer, returning its handle.
    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.entries.push(SubscriptionEntry { handle, observer });
        handle
    }

    /// Removes the subscription with the given handle.
    ///
    /// Returns `true` if the removal emptied a previously non-empty set.
    /// Detaching an unknown handle is a no-op returning `false`.
    pub fn detach(&mut self, handle: SubscriptionHandle) -> bool {
        let len_before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != len_before && self.entries.is_empty()
    }

    /// Delivers one result to every currently attached subscription, in
    /// insertion order.
    ///
    /// Single-shot observers receive the result and are detached; streaming
    /// observers receive `next` and persist. Returns `true` if the
    /// auto-detaches emptied a previously non-empty set.
    pub fn fan_out_next(&mut self, result: &ExecutionResult) -> bool {
        let was_non_empty = !self.entries.is_empty();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match entry.observer {
                Observer::SingleShot(callback) => callback(result.clone()),
                Observer::Streaming(observer) => {
                    observer.next(result.clone());
                    kept.push(SubscriptionEntry {
                        handle: entry.handle,
                        observer: Observer::Streaming(observer),
                    });
                }
            }
        }
        self.entries = kept;
        was_non_empty && self.entries.is_empty()
    }

    /// Delivers an execution failure to every streaming observer.
    ///
    /// Single-shot observers have no error channel and are skipped. The
    /// set is left intact; the caller disposes the observable afterwards.
    pub fn fan_out_error(&self, error: &ExecutionResult) {
        for entry in &self.entries {
            if let Observer::Streaming(observer) = &entry.observer {
                observer.error(error.clone());
            }
        }
    }

    /// Delivers `complete` to every streaming observer, then clears the
    /// set.
    ///
    /// Returns `true` unconditionally: completion always hands the emptied
    /// path to the lifecycle controller, even if nothing was attached.
    pub fn fan_out_complete(&mut self) -> bool {
        for entry in self.entries.drain(..) {
            if let Observer::Streaming(observer) = entry.observer {
                observer.complete();
            }
        }
        true
    }

    /// Returns the number of attached subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no subscription is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;

    fn recording_observer(tx: mpsc::Sender<String>, tag: &str) -> Observer {
        let tag = tag.to_string();
        let tx_next = tx.clone();
        let tag_next = tag.clone();
        let tx_err = tx.clone();
        let tag_err = tag.clone();
        Observer::streaming_fns(
            move |result| {
                let _ = tx_next.send(format!("{tag_next}:next:{result}"));
            },
            move |error| {
                let _ = tx_err.send(format!("{tag_err}:error:{error}"));
            },
            move || {
                let _ = tx.send(format!("{tag}:complete"));
            },
        )
    }

    #[test]
    fn detach_reports_emptying_once() {
        let mut set = SubscriptionSet::new();
        let (tx, _rx) = mpsc::channel();
        let a = set.subscribe(recording_observer(tx.clone(), "a"));
        let b = set.subscribe(recording_observer(tx, "b"));

        assert!(!set.detach(a));
        assert!(set.detach(b));
        // A second detach of the same handle finds nothing to remove.
        assert!(!set.detach(b));
    }

    #[test]
    fn handles_are_unique_per_set() {
        let mut set = SubscriptionSet::new();
        let a = set.subscribe(Observer::single_shot(|_| {}));
        let b = set.subscribe(Observer::single_shot(|_| {}));
        assert_ne!(a, b);
    }

    #[test]
    fn fan_out_next_preserves_insertion_order() {
        let mut set = SubscriptionSet::new();
        let (tx, rx) = mpsc::channel();
        set.subscribe(recording_observer(tx.clone(), "first"));
        set.subscribe(recording_observer(tx, "second"));

        set.fan_out_next(&serde_json::json!(1));

        let received: Vec<String> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec!["first:next:1".to_string(), "second:next:1".to_string()]
        );
    }

    #[test]
    fn single_shot_detached_after_first_delivery() {
        let mut set = SubscriptionSet::new();
        let deliveries = std::sync::Arc::new(Mutex::new(0_u32));
        let counter = std::sync::Arc::clone(&deliveries);
        set.subscribe(Observer::single_shot(move |_| {
            if let Ok(mut count) = counter.lock() {
                *count += 1;
            }
        }));

        assert!(set.fan_out_next(&serde_json::json!(1)));
        assert!(set.is_empty());
        // The set is empty now; a further fan-out delivers nothing.
        assert!(!set.fan_out_next(&serde_json::json!(2)));

        let Ok(count) = deliveries.lock() else {
            panic!("poisoned counter");
        };
        assert_eq!(*count, 1);
    }

    #[test]
    fn streaming_observer_survives_multiple_deliveries() {
        let mut set = SubscriptionSet::new();
        let (tx, rx) = mpsc::channel();
        set.subscribe(recording_observer(tx, "s"));

        assert!(!set.fan_out_next(&serde_json::json!(1)));
        assert!(!set.fan_out_next(&serde_json::json!(2)));
        assert_eq!(set.len(), 1);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn fan_out_error_skips_single_shot() {
        let mut set = SubscriptionSet::new();
        let (tx, rx) = mpsc::channel();
        set.subscribe(Observer::single_shot(|_| {}));
        set.subscribe(recording_observer(tx, "s"));

        set.fan_out_error(&serde_json::json!({"message": "boom"}));

        let received: Vec<String> = rx.try_iter().collect();
        assert_eq!(received, vec![r#"s:error:{"message":"boom"}"#.to_string()]);
        // Error delivery does not clear the set; disposal does.
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn fan_out_complete_clears_and_reports_emptied() {
        let mut set = SubscriptionSet::new();
        let (tx, rx) = mpsc::channel();
        set.subscribe(recording_observer(tx, "s"));

        assert!(set.fan_out_complete());
        assert!(set.is_empty());
        let received: Vec<String> = rx.try_iter().collect();
        assert_eq!(received, vec!["s:complete".to_string()]);

        // Unconditional even on an already-empty set.
        assert!(set.fan_out_complete());
    }

    #[test]
    fn re_subscribe_after_emptying_can_empty_again() {
        let mut set = SubscriptionSet::new();
        let a = set.subscribe(Observer::single_shot(|_| {}));
        assert!(set.detach(a));

        let b = set.subscribe(Observer::single_shot(|_| {}));
        assert!(set.detach(b));
    }
}

//! Query lifecycle controller and public fetcher surface.
//!
//! [`FetcherBridge`] is the entry point consumed by a GraphQL IDE
//! component: `fetch` dispatches one query and returns a
//! [`QueryObservable`] that any number of observers can subscribe to.
//! The bridge owns the [`crate::domain::ObservableRegistry`] and the push
//! demultiplexer task; both live exactly as long as the bridge.

mod lifecycle;
#[cfg(test)]
mod mock;

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::BridgeConfig;
use crate::domain::observable_id::ObservableId;
use crate::domain::observer::Observer;
use crate::domain::registry::{ObservableRef, ObservableRegistry};
use crate::domain::subscriptions::SubscriptionHandle;
use crate::error::BridgeError;
use crate::transport::Transport;
use crate::transport::wire::QueryRequest;

/// State shared between the bridge surface, its handles, and the
/// lifecycle tasks.
pub(crate) struct BridgeCore<T: Transport> {
    pub(crate) transport: T,
    pub(crate) registry: ObservableRegistry,
    pub(crate) config: BridgeConfig,
}

/// Fetcher bridge adapting a command/push-event transport to the
/// observable fetcher contract.
///
/// Owns the live query registry and the single push demultiplexer task.
/// Dropping the bridge aborts the demultiplexer without notifying the
/// backend; call [`FetcherBridge::shutdown`] for a cooperative teardown
/// that releases every still-streaming subscription.
pub struct FetcherBridge<T: Transport> {
    core: Arc<BridgeCore<T>>,
    demux: JoinHandle<()>,
}

impl<T: Transport> FetcherBridge<T> {
    /// Creates a bridge over the given transport and spawns the push
    /// demultiplexer. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ChannelClosed`] if the transport cannot
    /// provide its push event channel.
    pub fn new(transport: T, config: BridgeConfig) -> Result<Self, BridgeError> {
        let events = transport.listen(config.push_channel_capacity)?;
        let core = Arc::new(BridgeCore {
            transport,
            registry: ObservableRegistry::new(),
            config,
        });
        let demux = tokio::spawn(lifecycle::demux_loop(Arc::clone(&core), events));
        Ok(Self { core, demux })
    }

    /// Dispatches one query and returns its observable.
    ///
    /// The returned observable delivers to observers attached at delivery
    /// time: a terminal reply as one `next` followed by one `complete`, a
    /// streaming reply as a `next` per push event until the backend
    /// completes, errors, or every observer detaches.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidRequest`] if the query text is
    /// empty. This is the only failure surfaced to the caller directly;
    /// everything after dispatch reaches observers through the error
    /// fan-out channel instead.
    pub async fn fetch(&self, request: QueryRequest) -> Result<QueryObservable<T>, BridgeError> {
        if request.query().trim().is_empty() {
            return Err(BridgeError::InvalidRequest(
                "query text is empty".to_string(),
            ));
        }
        if self.core.config.log_payloads {
            tracing::debug!(
                query = %request.query(),
                operation = %request.operation_name(),
                variables = %request.variables(),
                "dispatching query"
            );
        }

        let (id, entry) = self.core.registry.create().await;
        tokio::spawn(lifecycle::run_dispatch(
            Arc::clone(&self.core),
            id,
            Arc::clone(&entry),
            request,
        ));

        Ok(QueryObservable {
            id,
            entry,
            core: Arc::clone(&self.core),
        })
    }

    /// Returns the number of live queries in the registry.
    pub async fn live_queries(&self) -> usize {
        self.core.registry.len().await
    }

    /// Tears the bridge down cooperatively.
    ///
    /// Aborts the demultiplexer, completes every remaining streaming
    /// observer, and releases every still-bound subscription key.
    /// Teardown never stops early; individual release failures are
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns the first release failure after teardown finishes.
    pub async fn shutdown(self) -> Result<(), BridgeError> {
        self.demux.abort();

        let mut first_failure = None;
        for (id, entry) in self.core.registry.drain().await {
            let key = {
                let mut observable = entry.lock().await;
                let _ = observable.fan_out_complete();
                if !observable.mark_disposed() {
                    continue;
                }
                observable.key().cloned()
            };
            if let Some(key) = key
                && let Err(err) = self.core.transport.release(&key).await
            {
                tracing::warn!(observable = %id, key = %key, error = %err, "release failed during shutdown");
                if first_failure.is_none() {
                    first_failure = Some(err);
                }
            }
            tracing::debug!(observable = %id, "query disposed at shutdown");
        }

        match first_failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

impl<T: Transport> Drop for FetcherBridge<T> {
    fn drop(&mut self) {
        self.demux.abort();
    }
}

impl<T: Transport> fmt::Debug for FetcherBridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetcherBridge").finish_non_exhaustive()
    }
}

/// Handle to one query's result stream.
///
/// Cheap to clone; every clone refers to the same underlying observable.
/// The handle outlives the registry entry, so subscribing after disposal
/// is accepted but delivers nothing.
pub struct QueryObservable<T: Transport> {
    id: ObservableId,
    entry: ObservableRef,
    core: Arc<BridgeCore<T>>,
}

impl<T: Transport> QueryObservable<T> {
    /// Returns the observable's identifier.
    #[must_use]
    pub fn id(&self) -> ObservableId {
        self.id
    }

    /// Attaches an observer, returning its subscription.
    pub async fn subscribe(&self, observer: Observer) -> QuerySubscription<T> {
        let handle = self.entry.lock().await.subscribe(observer);
        QuerySubscription {
            observable: self.id,
            handle,
            entry: Arc::clone(&self.entry),
            core: Arc::clone(&self.core),
        }
    }

    /// Returns the number of currently attached subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.entry.lock().await.subscriber_count()
    }
}

impl<T: Transport> Clone for QueryObservable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            entry: Arc::clone(&self.entry),
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Transport> fmt::Debug for QueryObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryObservable")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// One observer's attachment to a query observable.
///
/// Detaching is by value: consuming the subscription makes a double
/// detach unrepresentable.
pub struct QuerySubscription<T: Transport> {
    observable: ObservableId,
    handle: SubscriptionHandle,
    entry: ObservableRef,
    core: Arc<BridgeCore<T>>,
}

impl<T: Transport> QuerySubscription<T> {
    /// Returns the identifier of the observed query.
    #[must_use]
    pub fn observable_id(&self) -> ObservableId {
        self.observable
    }

    /// Returns the per-observable subscription handle.
    #[must_use]
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    /// Detaches this observer.
    ///
    /// If this was the last attached observer of a streaming query, the
    /// backend subscription is released and the query disposed. This is
    /// the sole cancellation mechanism and it is cooperative: events
    /// already in flight are discarded as stale.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the backend release call
    /// fails; the query is disposed locally regardless.
    pub async fn unsubscribe(self) -> Result<(), BridgeError> {
        let emptied = { self.entry.lock().await.detach(self.handle) };
        if emptied {
            lifecycle::dispose(&self.core, self.observable, &self.entry, true).await?;
        }
        Ok(())
    }
}

impl<T: Transport> fmt::Debug for QuerySubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("observable", &self.observable)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

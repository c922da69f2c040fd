//! Query lifecycle internals.
//!
//! Drives each query through `Created → AwaitingFirstResponse →
//! {Terminal | Streaming} → Disposed`: the dispatch continuation
//! classifies the first reply, the demultiplexer routes push events from
//! the single shared channel to the owning observable, and `dispose`
//! tears a query down exactly once.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::BridgeCore;
use crate::domain::observable_id::ObservableId;
use crate::domain::observer::ExecutionResult;
use crate::domain::registry::ObservableRef;
use crate::error::BridgeError;
use crate::transport::Transport;
use crate::transport::wire::{DispatchReply, PushEvent, QueryRequest, StreamSignal};

/// Awaits the first backend reply for one query and classifies it.
///
/// Spawned once per fetch. A terminal reply is fanned out as one `next`
/// followed by one `complete`, then the query is disposed without a
/// backend release (no backend resource was registered). A pending reply
/// binds the subscription key and leaves the query streaming. Failures
/// become an error fan-out followed by disposal.
pub(super) async fn run_dispatch<T: Transport>(
    core: Arc<BridgeCore<T>>,
    id: ObservableId,
    entry: ObservableRef,
    request: QueryRequest,
) {
    let classified = match core.transport.dispatch(&request).await {
        Ok(raw) => DispatchReply::decode(&raw),
        Err(err) => Err(err),
    };

    match classified {
        Ok(DispatchReply::Terminal(results)) => {
            {
                let mut observable = entry.lock().await;
                let _ = observable.fan_out_next(&results);
                let _ = observable.fan_out_complete();
            }
            if let Err(err) = dispose(&core, id, &entry, false).await {
                tracing::warn!(observable = %id, error = %err, "disposal after terminal reply failed");
            }
        }
        Ok(DispatchReply::Pending(key)) => match core.registry.bind(id, key.clone()).await {
            Ok(()) => {
                tracing::debug!(observable = %id, key = %key, "query entered streaming state");
            }
            Err(BridgeError::NotFound(_)) => {
                // Every observer detached while the dispatch was in
                // flight; the backend registered a resource nobody is
                // left to consume.
                tracing::debug!(
                    observable = %id,
                    key = %key,
                    "pending key arrived for a detached query; releasing"
                );
                if let Err(err) = core.transport.release(&key).await {
                    tracing::warn!(
                        observable = %id,
                        key = %key,
                        error = %err,
                        "failed to release orphaned subscription key"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(observable = %id, key = %key, error = %err, "binding subscription key failed");
                deliver_failure(&core, id, &entry, &err).await;
            }
        },
        Err(err) => {
            tracing::warn!(observable = %id, error = %err, "dispatch failed");
            deliver_failure(&core, id, &entry, &err).await;
        }
    }
}

/// Routes push events from the shared channel until the transport closes
/// it.
///
/// One task per bridge. Each event is processed to completion before the
/// next is received, so per-key delivery order follows channel arrival
/// order.
pub(super) async fn demux_loop<T: Transport>(
    core: Arc<BridgeCore<T>>,
    mut events: mpsc::Receiver<String>,
) {
    while let Some(raw) = events.recv().await {
        route_push(&core, &raw).await;
    }
    tracing::debug!("push channel closed; demultiplexer exiting");
}

/// Decodes one push event and delivers it to the owning observable.
///
/// Undecodable text and stale subscription keys are logged and dropped;
/// the push channel is fire-and-forget and has no caller to fail.
async fn route_push<T: Transport>(core: &BridgeCore<T>, raw: &str) {
    let event = match PushEvent::decode(raw) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "discarding undecodable push event");
            return;
        }
    };

    let Some((id, entry)) = core.registry.resolve(&event.subscription).await else {
        tracing::debug!(key = %event.subscription, "discarding push event for stale subscription key");
        return;
    };

    match event.signal {
        StreamSignal::Next(result) => {
            let emptied = { entry.lock().await.fan_out_next(&result) };
            if emptied {
                // The last attached observer was single-shot; its
                // auto-detach cancels the stream like any other detach.
                if let Err(err) = dispose(core, id, &entry, true).await {
                    tracing::warn!(
                        observable = %id,
                        error = %err,
                        "release after final single-shot delivery failed"
                    );
                }
            }
        }
        StreamSignal::Error(error) => {
            {
                entry.lock().await.fan_out_error(&error);
            }
            if let Err(err) = dispose(core, id, &entry, false).await {
                tracing::warn!(observable = %id, error = %err, "disposal after backend error failed");
            }
        }
        StreamSignal::Complete => {
            {
                let _ = entry.lock().await.fan_out_complete();
            }
            if let Err(err) = dispose(core, id, &entry, false).await {
                tracing::warn!(observable = %id, error = %err, "disposal after backend completion failed");
            }
        }
    }
}

/// Fans a lifecycle failure out to streaming observers, then disposes.
async fn deliver_failure<T: Transport>(
    core: &BridgeCore<T>,
    id: ObservableId,
    entry: &ObservableRef,
    err: &BridgeError,
) {
    let payload: ExecutionResult = serde_json::json!({ "message": err.to_string() });
    {
        entry.lock().await.fan_out_error(&payload);
    }
    if let Err(err) = dispose(core, id, entry, false).await {
        tracing::warn!(observable = %id, error = %err, "disposal after lifecycle failure failed");
    }
}

/// Tears one query down: marks it disposed, optionally releases the
/// backend subscription, and removes the registry entry.
///
/// Idempotent: an emptied-notification racing a backend completion makes
/// the second invocation a no-op. Only the all-observers-detached path
/// passes `release_backend`; terminal completion never registered a
/// backend resource and a backend-signalled complete/error means the
/// backend already considers the stream finished.
///
/// # Errors
///
/// Returns [`BridgeError::Transport`] if the backend release call fails;
/// the registry entry is still removed.
pub(super) async fn dispose<T: Transport>(
    core: &BridgeCore<T>,
    id: ObservableId,
    entry: &ObservableRef,
    release_backend: bool,
) -> Result<(), BridgeError> {
    let key = {
        let mut observable = entry.lock().await;
        if !observable.mark_disposed() {
            return Ok(());
        }
        observable.key().cloned()
    };

    let released = match (release_backend, key) {
        (true, Some(key)) => core.transport.release(&key).await,
        _ => Ok(()),
    };

    let _ = core.registry.remove(id).await;
    tracing::debug!(observable = %id, "query disposed");
    released
}

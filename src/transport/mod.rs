//! Transport seam to the backend process.
//!
//! The bridge never talks to the backend directly; it depends on the
//! [`Transport`] trait, which wraps the host's two external primitives
//! (invoke-a-command and listen-for-event) plus the release command. Wire
//! payload shapes live in [`wire`].

pub mod wire;

pub use wire::{
    DispatchReply, FETCH_QUERY_COMMAND, PUSH_EVENT_CHANNEL, PushEvent, QueryRequest, StreamSignal,
    UNSUBSCRIBE_COMMAND,
};

use std::future::Future;

use tokio::sync::mpsc;

use crate::domain::subscription_key::SubscriptionKey;
use crate::error::BridgeError;

/// Backend transport contract.
///
/// Implementations adapt a concrete host (an IPC layer, a test double) to
/// the three operations the bridge needs. All failures must surface as
/// `Err`, never as silent drops.
pub trait Transport: Send + Sync + 'static {
    /// Sends one query command to the backend.
    ///
    /// Resolves with the raw JSON reply text: either a terminal payload
    /// `{"results": ...}` or a pending-stream marker `{"pending": ...}`.
    /// Classification happens in [`wire::DispatchReply::decode`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the command cannot be
    /// delivered or the backend rejects it.
    fn dispatch(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send;

    /// Returns the shared push event channel.
    ///
    /// Called exactly once per bridge lifetime; every live query shares
    /// this single channel, which is why events must carry a subscription
    /// key for demultiplexing. Each received item is the raw JSON text of
    /// one push event on the [`PUSH_EVENT_CHANNEL`] stream. Dropping the
    /// receiver detaches the listener.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ChannelClosed`] if the host cannot provide
    /// the event stream.
    fn listen(&self, capacity: usize) -> Result<mpsc::Receiver<String>, BridgeError>;

    /// Asks the backend to stop emitting events for `key` and free the
    /// resources behind it.
    ///
    /// Cooperative: events already in flight may still arrive afterwards
    /// and are discarded by the bridge as stale.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the command cannot be
    /// delivered or the backend rejects it.
    fn release(
        &self,
        key: &SubscriptionKey,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

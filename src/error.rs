//! Bridge error types.
//!
//! [`BridgeError`] is the central error type for the bridge. Variants map
//! onto the failure classes of the query lifecycle: invocation errors are
//! the only kind surfaced synchronously to a `fetch` caller; transport and
//! protocol failures are contained inside the bridge and reach observers
//! through the error fan-out channel, never as unhandled failures.

use crate::domain::observable_id::ObservableId;

/// Central error enum for all bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The fetch request was rejected before any backend call was made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The dispatch or release call itself failed (backend unreachable,
    /// command rejected).
    #[error("transport error: {0}")]
    Transport(String),

    /// A reply or push event matched neither expected payload shape.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A payload could not be decoded as JSON.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A subscription key binding diverged from an existing one.
    #[error("subscription key conflict: {0}")]
    KeyConflict(String),

    /// No live observable matches the given identifier.
    #[error("unknown observable {0}")]
    NotFound(ObservableId),

    /// The transport could not provide its push event channel.
    #[error("push channel unavailable: {0}")]
    ChannelClosed(String),
}

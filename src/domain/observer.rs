//! Observer shapes attachable to a query observable.
//!
//! The bridge accepts two observer forms as an explicit tagged variant:
//! a single-delivery callback ("fetch once" usage) and a full observer
//! object with next/error/complete channels. Dispatch is always on the
//! variant, never on runtime shape inspection.

use std::fmt;

/// JSON value of one GraphQL execution result.
pub type ExecutionResult = serde_json::Value;

/// Boxed callback for a single-delivery observer.
pub type SingleShotFn = Box<dyn FnOnce(ExecutionResult) + Send>;

/// Full observer object able to consume a result stream.
///
/// Implementations must be safe to call from the bridge's demultiplexer
/// task; the bridge never calls any method after `error` or `complete`.
pub trait StreamingObserver: Send {
    /// Delivers one execution result.
    fn next(&self, result: ExecutionResult);

    /// Delivers a query execution failure.
    fn error(&self, error: ExecutionResult);

    /// Signals that no further results will arrive.
    fn complete(&self);
}

/// Observer attached by a `subscribe` call.
///
/// Single-shot observers receive at most one delivery and are detached
/// automatically afterwards, even on a streaming query that keeps
/// emitting. Streaming observers persist until explicit detach or an
/// error/complete signal.
pub enum Observer {
    /// One-delivery callback with no error/complete channels.
    SingleShot(SingleShotFn),
    /// Persistent observer object with next/error/complete channels.
    Streaming(Box<dyn StreamingObserver>),
}

impl Observer {
    /// Wraps a callback as a single-delivery observer.
    #[must_use]
    pub fn single_shot(callback: impl FnOnce(ExecutionResult) + Send + 'static) -> Self {
        Self::SingleShot(Box::new(callback))
    }

    /// Wraps an observer object as a streaming observer.
    #[must_use]
    pub fn streaming(observer: impl StreamingObserver + 'static) -> Self {
        Self::Streaming(Box::new(observer))
    }

    /// Builds a streaming observer from three closures, for callers
    /// without a dedicated observer type.
    #[must_use]
    pub fn streaming_fns(
        next: impl Fn(ExecutionResult) + Send + 'static,
        error: impl Fn(ExecutionResult) + Send + 'static,
        complete: impl Fn() + Send + 'static,
    ) -> Self {
        Self::Streaming(Box::new(FnObserver {
            next: Box::new(next),
            error: Box::new(error),
            complete: Box::new(complete),
        }))
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleShot(_) => f.write_str("Observer::SingleShot"),
            Self::Streaming(_) => f.write_str("Observer::Streaming"),
        }
    }
}

/// Closure-backed [`StreamingObserver`].
struct FnObserver {
    next: Box<dyn Fn(ExecutionResult) + Send>,
    error: Box<dyn Fn(ExecutionResult) + Send>,
    complete: Box<dyn Fn() + Send>,
}

impl StreamingObserver for FnObserver {
    fn next(&self, result: ExecutionResult) {
        (self.next)(result);
    }

    fn error(&self, error: ExecutionResult) {
        (self.error)(error);
    }

    fn complete(&self) {
        (self.complete)();
    }
}

//! Controllable transport double and observer recorders for bridge tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::observer::{ExecutionResult, Observer};
use crate::domain::subscription_key::SubscriptionKey;
use crate::error::BridgeError;
use crate::transport::Transport;
use crate::transport::wire::QueryRequest;

/// Transport double whose replies, push events, and release behaviour are
/// driven from the test body through a [`MockHandle`].
pub(crate) struct MockTransport {
    replies: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<String, BridgeError>>>,
    push_slot: Arc<StdMutex<Option<mpsc::Sender<String>>>>,
    released: Arc<StdMutex<Vec<SubscriptionKey>>>,
    release_notify: mpsc::UnboundedSender<SubscriptionKey>,
    fail_releases: Arc<AtomicBool>,
}

/// Test-side controls for a [`MockTransport`].
pub(crate) struct MockHandle {
    replies: mpsc::UnboundedSender<Result<String, BridgeError>>,
    push_slot: Arc<StdMutex<Option<mpsc::Sender<String>>>>,
    released: Arc<StdMutex<Vec<SubscriptionKey>>>,
    pub(crate) release_events: mpsc::UnboundedReceiver<SubscriptionKey>,
    fail_releases: Arc<AtomicBool>,
}

/// Builds a transport double plus the handle driving it.
pub(crate) fn mock_transport() -> (MockTransport, MockHandle) {
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    let (release_tx, release_rx) = mpsc::unbounded_channel();
    let push_slot = Arc::new(StdMutex::new(None));
    let released = Arc::new(StdMutex::new(Vec::new()));
    let fail_releases = Arc::new(AtomicBool::new(false));

    let transport = MockTransport {
        replies: tokio::sync::Mutex::new(reply_rx),
        push_slot: Arc::clone(&push_slot),
        released: Arc::clone(&released),
        release_notify: release_tx,
        fail_releases: Arc::clone(&fail_releases),
    };
    let handle = MockHandle {
        replies: reply_tx,
        push_slot,
        released,
        release_events: release_rx,
        fail_releases,
    };
    (transport, handle)
}

impl MockHandle {
    /// Resolves the next pending dispatch with raw reply text.
    pub(crate) fn reply(&self, raw: &str) {
        let _ = self.replies.send(Ok(raw.to_string()));
    }

    /// Rejects the next pending dispatch.
    pub(crate) fn reply_err(&self, err: BridgeError) {
        let _ = self.replies.send(Err(err));
    }

    /// Emits one raw event on the shared push channel.
    #[allow(clippy::panic)]
    pub(crate) async fn push(&self, raw: &str) {
        let sender = self
            .push_slot
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        let Some(sender) = sender else {
            panic!("push channel not open; was the bridge constructed?");
        };
        let _ = sender.send(raw.to_string()).await;
    }

    /// Returns every key released so far, in call order.
    pub(crate) fn released(&self) -> Vec<SubscriptionKey> {
        self.released
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }

    /// Makes all further release calls fail.
    pub(crate) fn fail_releases(&self) {
        self.fail_releases.store(true, Ordering::Relaxed);
    }
}

impl Transport for MockTransport {
    async fn dispatch(&self, _request: &QueryRequest) -> Result<String, BridgeError> {
        self.replies
            .lock()
            .await
            .recv()
            .await
            .unwrap_or_else(|| Err(BridgeError::Transport("mock reply channel closed".to_string())))
    }

    fn listen(&self, capacity: usize) -> Result<mpsc::Receiver<String>, BridgeError> {
        let (tx, rx) = mpsc::channel(capacity);
        if let Ok(mut slot) = self.push_slot.lock() {
            *slot = Some(tx);
        }
        Ok(rx)
    }

    async fn release(&self, key: &SubscriptionKey) -> Result<(), BridgeError> {
        if self.fail_releases.load(Ordering::Relaxed) {
            return Err(BridgeError::Transport("mock release failure".to_string()));
        }
        if let Ok(mut released) = self.released.lock() {
            released.push(key.clone());
        }
        let _ = self.release_notify.send(key.clone());
        Ok(())
    }
}

/// One delivery recorded by a [`channel_observer`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ObservedEvent {
    Next(ExecutionResult),
    Error(ExecutionResult),
    Complete,
}

/// Builds a streaming observer that forwards every delivery to a channel.
pub(crate) fn channel_observer() -> (Observer, mpsc::UnboundedReceiver<ObservedEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let tx_error = tx.clone();
    let tx_complete = tx.clone();
    let observer = Observer::streaming_fns(
        move |result| {
            let _ = tx.send(ObservedEvent::Next(result));
        },
        move |error| {
            let _ = tx_error.send(ObservedEvent::Error(error));
        },
        move || {
            let _ = tx_complete.send(ObservedEvent::Complete);
        },
    );
    (observer, rx)
}

/// Awaits the next recorded delivery, failing the test after one second.
#[allow(clippy::panic)]
pub(crate) async fn recv_event(rx: &mut mpsc::UnboundedReceiver<ObservedEvent>) -> ObservedEvent {
    match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => panic!("observer channel closed without an event"),
        Err(_) => panic!("no observer event within timeout"),
    }
}

/// Awaits the next recorded release, failing the test after one second.
#[allow(clippy::panic)]
pub(crate) async fn recv_release(rx: &mut mpsc::UnboundedReceiver<SubscriptionKey>) -> SubscriptionKey {
    match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        Ok(Some(key)) => key,
        Ok(None) => panic!("release channel closed without an event"),
        Err(_) => panic!("no release within timeout"),
    }
}

/// Lets already-spawned bridge tasks run to their next suspension point.
pub(crate) async fn drain_scheduler() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Installs a debug-level test subscriber; safe to call repeatedly.
pub(crate) fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

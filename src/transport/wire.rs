//! Wire payload types: query requests, dispatch replies, push events.
//!
//! Both dispatch replies and push events arrive as JSON-encoded text and
//! are decoded here before any routing decision. The decode step also
//! classifies each payload: a reply is terminal or pending, a push event
//! carries exactly one of the three stream signals.

use serde::{Deserialize, Serialize};

use crate::domain::observer::ExecutionResult;
use crate::domain::subscription_key::SubscriptionKey;
use crate::error::BridgeError;

/// Backend command name for dispatching a query.
pub const FETCH_QUERY_COMMAND: &str = "fetch_query";

/// Backend command name for releasing a streaming subscription.
pub const UNSUBSCRIBE_COMMAND: &str = "unsubscribe";

/// Name of the backend's push event channel.
pub const PUSH_EVENT_CHANNEL: &str = "next";

/// One query to execute against the backend.
///
/// Immutable after construction: document text, operation name (possibly
/// empty), and variables as serialized JSON text (possibly empty).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    query: String,
    operation_name: String,
    variables: String,
}

impl QueryRequest {
    /// Creates a request for the given query document, with empty
    /// operation name and variables.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: String::new(),
            variables: String::new(),
        }
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = name.into();
        self
    }

    /// Sets the variables from a JSON value, serializing it to text.
    #[must_use]
    pub fn with_variables(mut self, variables: &serde_json::Value) -> Self {
        self.variables = variables.to_string();
        self
    }

    /// Returns the query document text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the operation name; empty when unset.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Returns the serialized variables; empty when unset.
    #[must_use]
    pub fn variables(&self) -> &str {
        &self.variables
    }
}

/// Raw shape of a dispatch reply before classification.
#[derive(Debug, Deserialize)]
struct ReplyBody {
    #[serde(default)]
    results: Option<ExecutionResult>,
    #[serde(default)]
    pending: Option<SubscriptionKey>,
}

/// Classified first reply to a dispatched query.
#[derive(Debug, Clone)]
pub enum DispatchReply {
    /// The backend executed the query immediately; this is the only
    /// result the query will ever produce.
    Terminal(ExecutionResult),
    /// The backend started a stream; results follow on the push channel
    /// under the given subscription key.
    Pending(SubscriptionKey),
}

impl DispatchReply {
    /// Decodes and classifies one reply payload.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Malformed`] if the text is not JSON and
    /// [`BridgeError::Protocol`] if the payload matches neither the
    /// terminal nor the pending shape (or both at once).
    pub fn decode(raw: &str) -> Result<Self, BridgeError> {
        let body: ReplyBody = serde_json::from_str(raw)?;
        match (body.results, body.pending) {
            (Some(results), None) => Ok(Self::Terminal(results)),
            (None, Some(key)) => Ok(Self::Pending(key)),
            (Some(_), Some(_)) => Err(BridgeError::Protocol(
                "reply carries both results and pending".to_string(),
            )),
            (None, None) => Err(BridgeError::Protocol(
                "reply carries neither results nor pending".to_string(),
            )),
        }
    }
}

/// Raw shape of a push event before classification.
#[derive(Debug, Deserialize)]
struct PushBody {
    subscription: SubscriptionKey,
    #[serde(default)]
    next: Option<ExecutionResult>,
    #[serde(default)]
    error: Option<ExecutionResult>,
    #[serde(default)]
    complete: Option<bool>,
}

/// Signal carried by one push event.
#[derive(Debug, Clone)]
pub enum StreamSignal {
    /// One more execution result for the stream.
    Next(ExecutionResult),
    /// The backend reports the stream failed; no further events follow.
    Error(ExecutionResult),
    /// The backend reports the stream finished; no further events follow.
    Complete,
}

/// One decoded event from the shared push channel.
#[derive(Debug, Clone)]
pub struct PushEvent {
    /// Key identifying the streaming query this event belongs to.
    pub subscription: SubscriptionKey,
    /// The classified signal.
    pub signal: StreamSignal,
}

impl PushEvent {
    /// Decodes and classifies one push event payload.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Malformed`] if the text is not JSON and
    /// [`BridgeError::Protocol`] unless exactly one of `next`, `error`,
    /// `complete` is present.
    pub fn decode(raw: &str) -> Result<Self, BridgeError> {
        let body: PushBody = serde_json::from_str(raw)?;
        let signal = match (body.next, body.error, body.complete) {
            (Some(result), None, None) => StreamSignal::Next(result),
            (None, Some(error), None) => StreamSignal::Error(error),
            (None, None, Some(true)) => StreamSignal::Complete,
            _ => {
                return Err(BridgeError::Protocol(format!(
                    "push event for {} carries no recognisable signal",
                    body.subscription
                )));
            }
        };
        Ok(Self {
            subscription: body.subscription,
            signal,
        })
    }
}

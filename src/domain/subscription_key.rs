//! Backend-assigned streaming subscription token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token identifying a streaming query instance on the shared push channel.
///
/// Assigned by the backend in a pending reply, immutable once bound, and
/// mapped to exactly one observable at any time. Carried verbatim in every
/// push event and in the release command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// Creates a `SubscriptionKey` from backend-provided token text.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubscriptionKey {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SubscriptionKey {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

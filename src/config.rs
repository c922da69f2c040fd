//! Bridge configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with defaults when a variable is not
//! set.

/// Top-level bridge configuration.
///
/// Loaded once at startup via [`BridgeConfig::from_env`], or constructed
/// directly by embedding applications.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Capacity of the shared push event channel requested from the
    /// transport.
    pub push_channel_capacity: usize,

    /// Whether to log query text, operation names, and variables at debug
    /// level on every fetch.
    pub log_payloads: bool,
}

impl BridgeConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set or cannot be
    /// parsed. Calls `dotenvy::dotenv().ok()` to optionally load a `.env`
    /// file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            push_channel_capacity: parse_env("GQL_BRIDGE_PUSH_CHANNEL_CAPACITY", 256),
            log_payloads: parse_env_bool("GQL_BRIDGE_LOG_PAYLOADS", true),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            push_channel_capacity: 256,
            log_payloads: true,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}

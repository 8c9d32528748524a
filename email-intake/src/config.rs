//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. Empty values count as
//! unset, so `BLOB_CONNECTION_STRING=""` behaves like a missing variable.

use std::env;
use std::str::FromStr;

use tracing::warn;

/// Container used when `BLOB_CONTAINER` is not set.
pub const DEFAULT_CONTAINER: &str = "email-landing";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Storage connection string. `None` makes every intake request fail with 500.
    pub blob_connection_string: Option<String>,

    /// Container that receives both the raw payloads and the summaries
    pub blob_container: String,

    /// Function key callers must present. `None` disables the check.
    pub function_key: Option<String>,

    /// Timeout for a single storage request in milliseconds
    pub storage_timeout_ms: u64,

    /// Largest request body accepted by the intake route
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // Functions custom handlers get their port from the host
        let port = match non_empty("FUNCTIONS_CUSTOMHANDLER_PORT") {
            Some(raw) => parse_value("FUNCTIONS_CUSTOMHANDLER_PORT", Some(raw), 8080),
            None => parse_value("PORT", non_empty("PORT"), 8080),
        };

        Config {
            port,

            blob_connection_string: non_empty("BLOB_CONNECTION_STRING"),

            blob_container: non_empty("BLOB_CONTAINER")
                .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),

            function_key: non_empty("FUNCTION_KEY"),

            storage_timeout_ms: parse_value(
                "STORAGE_TIMEOUT_MS",
                non_empty("STORAGE_TIMEOUT_MS"),
                30_000,
            ),

            max_body_bytes: parse_value(
                "MAX_BODY_BYTES",
                non_empty("MAX_BODY_BYTES"),
                25 * 1024 * 1024,
            ),
        }
    }

    /// Whether a storage connection string is available.
    pub fn storage_configured(&self) -> bool {
        self.blob_connection_string.is_some()
    }
}

/// Parse an optional raw value, warning and falling back on bad input.
fn parse_value<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

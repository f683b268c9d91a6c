//! Configuration management for the IRR Explorer client.
//!
//! Settings are loaded from environment variables once at startup. The
//! binary also reads a `.env` file through `dotenvy` before loading.

use crate::retry::{RetryPolicy, DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS};
use std::fmt;
use std::time::Duration;

/// Default IRR Explorer instance
pub const DEFAULT_BASE_URL: &str = "https://irrexplorer.nlnog.net";
/// Default per-request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default number of overlap lookups a prefix query runs at once
pub const DEFAULT_FOLLOW_UP_CONCURRENCY: usize = 4;

/// Client configuration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// Base URL of the IRR Explorer instance, without trailing slash.
    /// Environment variable: `IRREXPLORER_BASE_URL`
    pub base_url: String,

    /// Per-request timeout in seconds.
    /// Environment variable: `IRREXPLORER_TIMEOUT_SECS`
    pub timeout_secs: u64,

    /// Total attempts per request, the first one included.
    /// Environment variable: `IRREXPLORER_MAX_ATTEMPTS`
    pub max_attempts: u32,

    /// Initial backoff duration in milliseconds between attempts.
    /// Environment variable: `IRREXPLORER_BACKOFF_MS`
    pub backoff_ms: u64,

    /// Maximum overlap lookups a prefix query runs at once.
    /// Environment variable: `IRREXPLORER_FOLLOW_UP_CONCURRENCY`
    pub follow_up_concurrency: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            follow_up_concurrency: DEFAULT_FOLLOW_UP_CONCURRENCY,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ExplorerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to the
    /// defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let base_url = match std::env::var("IRREXPLORER_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => DEFAULT_BASE_URL.to_string(),
        };
        Self {
            base_url,
            timeout_secs: env_or("IRREXPLORER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            max_attempts: env_or("IRREXPLORER_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            backoff_ms: env_or("IRREXPLORER_BACKOFF_MS", DEFAULT_BACKOFF_MS),
            follow_up_concurrency: env_or(
                "IRREXPLORER_FOLLOW_UP_CONCURRENCY",
                DEFAULT_FOLLOW_UP_CONCURRENCY,
            )
            .max(1),
        }
    }

    /// Replace the base URL, e.g. from a command-line override.
    pub fn with_base_url<S: fmt::Display>(self, url: S) -> Self {
        Self {
            base_url: url.to_string().trim_end_matches('/').to_string(),
            ..self
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy with the configured attempts and backoff.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

impl fmt::Display for ExplorerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "base_url={}, timeout_secs={}, max_attempts={}, backoff_ms={}, follow_up_concurrency={}",
            self.base_url,
            self.timeout_secs,
            self.max_attempts,
            self.backoff_ms,
            self.follow_up_concurrency
        )
    }
}

//! Error handling for fan-out lookups.
//!
//! Two layers of errors exist: a [`TransportError`] describes why one
//! lookup failed and lives on that lookup's task state, while an
//! [`AggregateError`] is what the coordinator reports once every task has
//! reached a terminal state and at least one of them failed.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote lookup.
///
/// Every variant carries the key that was being looked up so the error is
/// still meaningful once it has been collected into an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection-level failure (DNS, refused connection, TLS, ...)
    #[error("network error for '{key}': {message}")]
    Network { key: String, message: String },

    /// The remote answered with a non-success HTTP status
    #[error("lookup of '{key}' returned HTTP {status}")]
    Status { key: String, status: u16 },

    /// The response body could not be decoded into a payload
    #[error("malformed response for '{key}': {message}")]
    Parse { key: String, message: String },

    /// The lookup did not finish within the per-task timeout
    #[error("lookup of '{key}' timed out after {after:?}")]
    Timeout { key: String, after: Duration },

    /// The key cannot be turned into a request for this source
    #[error("cannot look up '{key}': {message}")]
    Request { key: String, message: String },

    /// The task ended without producing an outcome
    #[error("lookup of '{key}' failed internally: {message}")]
    Internal { key: String, message: String },
}

impl TransportError {
    pub fn network<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Network {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn status<K: Into<String>>(key: K, status: u16) -> Self {
        Self::Status {
            key: key.into(),
            status,
        }
    }

    pub fn parse<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Parse {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn timeout<K: Into<String>>(key: K, after: Duration) -> Self {
        Self::Timeout {
            key: key.into(),
            after,
        }
    }

    pub fn request<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Request {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn internal<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Internal {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Build a transport error from a reqwest failure for `key`.
    pub fn from_reqwest<K: Into<String>>(key: K, err: &reqwest::Error) -> Self {
        let key = key.into();
        if let Some(status) = err.status() {
            Self::status(key, status.as_u16())
        } else if err.is_decode() {
            Self::parse(key, err.to_string())
        } else {
            Self::network(key, err.to_string())
        }
    }

    /// The key whose lookup failed.
    pub fn key(&self) -> &str {
        match self {
            Self::Network { key, .. }
            | Self::Status { key, .. }
            | Self::Parse { key, .. }
            | Self::Timeout { key, .. }
            | Self::Request { key, .. }
            | Self::Internal { key, .. } => key,
        }
    }
}

/// One or more lookups of a fan-out failed.
///
/// Failures are listed in the order their keys were given to the
/// coordinator. No successful payloads are carried here; callers that need
/// them read the individual task handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    failures: Vec<TransportError>,
    total: usize,
}

impl AggregateError {
    pub fn new(failures: Vec<TransportError>, total: usize) -> Self {
        Self { failures, total }
    }

    pub fn failures(&self) -> &[TransportError] {
        &self.failures
    }

    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures.iter().map(TransportError::key).collect()
    }

    /// Number of lookups the failed run dispatched.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} lookups failed",
            self.failures.len(),
            self.total
        )?;
        for failure in &self.failures {
            write!(f, "\n  - {}: {}", failure.key(), failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum FanOutError {
    /// A lookup key was rejected before dispatch
    #[error("invalid lookup key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Invalid configuration values
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Reading a key list or config file failed
    #[error("file error at '{path}': {message}")]
    File { path: String, message: String },

    /// The HTTP client behind a source could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// At least one lookup of a run failed
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl FanOutError {
    pub fn invalid_key<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn file<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }
}

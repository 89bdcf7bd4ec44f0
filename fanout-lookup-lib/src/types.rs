//! Core data types for fan-out lookups.
//!
//! This module defines the key, payload and result types that flow from the
//! lookup sources through the tasks into the coordinator's aggregate, plus
//! the runtime configuration shared by every task of a run.

use crate::error::{FanOutError, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Opaque identifier of a lookup target (an account or page name).
///
/// Keys are trimmed and must not be empty. Duplicates are fine; each one is
/// looked up independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupKey(String);

impl LookupKey {
    pub fn new<S: AsRef<str>>(key: S) -> Result<Self, FanOutError> {
        let trimmed = key.as_ref().trim();
        if trimmed.is_empty() {
            return Err(FanOutError::invalid_key(
                key.as_ref(),
                "Lookup key cannot be empty",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LookupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The fixed-shape record a source returns for one key.
///
/// Every field is optional because remote profiles routinely leave them
/// blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupPayload {
    /// Display name of the account or page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Website advertised by the account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Canonical handle as reported by the remote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,

    /// Public URL of the profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
}

impl fmt::Display for LookupPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={}, website={}",
            self.name.as_deref().unwrap_or("null"),
            self.website.as_deref().unwrap_or("null")
        )
    }
}

/// Successful outcome of one lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    /// The key that was looked up
    pub key: LookupKey,

    /// What the source returned for the key
    pub payload: LookupPayload,

    /// Name of the source that answered
    pub source: String,

    /// Time from task start until it settled, simulated latency included
    pub fetch_duration: Duration,
}

/// Completion state of a lookup task.
///
/// A task leaves `Pending` exactly once; `Done` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    Done(LookupResult),
    Failed(TransportError),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending)
    }
}

/// Everything a successful fan-out produces.
///
/// `results` holds one entry per input key, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateOutcome {
    pub results: Vec<LookupResult>,

    /// Wall-clock time from first dispatch to the last task settling
    pub elapsed: Duration,
}

impl AggregateOutcome {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Remote sources the library ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    GitHub,
    Facebook,
}

impl FromStr for SourceKind {
    type Err = FanOutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" | "gh" => Ok(SourceKind::GitHub),
            "facebook" | "fb" => Ok(SourceKind::Facebook),
            other => Err(FanOutError::config(format!(
                "Unknown source '{}'. Use 'github' or 'facebook'",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::GitHub => write!(f, "github"),
            SourceKind::Facebook => write!(f, "facebook"),
        }
    }
}

/// Runtime options applied to every task of a fan-out.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Upper bound for one fetch; expiry turns into a failed task.
    /// Default: 10 seconds
    pub task_timeout: Option<Duration>,

    /// Constant delay applied after the fetch returns and before the task
    /// settles. Used for demonstrations and timing tests.
    /// Default: none
    pub simulated_latency: Option<Duration>,

    /// User-Agent sent by the HTTP sources
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            task_timeout: Some(Duration::from_secs(10)),
            simulated_latency: None,
            user_agent: format!("fanout-lookup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl LookupConfig {
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn without_task_timeout(mut self) -> Self {
        self.task_timeout = None;
        self
    }

    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = if latency.is_zero() {
            None
        } else {
            Some(latency)
        };
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_key_trims_and_rejects_empty() {
        assert_eq!(LookupKey::new("  octocat ").unwrap().as_str(), "octocat");
        assert!(LookupKey::new("").is_err());
        assert!(LookupKey::new("   ").is_err());
    }

    #[test]
    fn test_payload_display_matches_profile_format() {
        let payload = LookupPayload {
            name: Some("Spring".to_string()),
            website: None,
            ..Default::default()
        };
        assert_eq!(payload.to_string(), "name=Spring, website=null");
    }

    #[test]
    fn test_payload_serialization_skips_missing_fields() {
        let payload = LookupPayload {
            name: Some("Cloud Foundry".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Cloud Foundry" }));
    }

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!("github".parse::<SourceKind>().unwrap(), SourceKind::GitHub);
        assert_eq!("GH".parse::<SourceKind>().unwrap(), SourceKind::GitHub);
        assert_eq!("facebook".parse::<SourceKind>().unwrap(), SourceKind::Facebook);
        assert!("gitlab".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::GitHub.to_string(), "github");
    }

    #[test]
    fn test_config_builders() {
        let config = LookupConfig::default()
            .with_simulated_latency(Duration::from_millis(1000))
            .without_task_timeout();
        assert_eq!(config.simulated_latency, Some(Duration::from_millis(1000)));
        assert!(config.task_timeout.is_none());

        let config = config.with_simulated_latency(Duration::ZERO);
        assert!(config.simulated_latency.is_none());
    }
}

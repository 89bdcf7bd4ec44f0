//! Remote lookup sources.
//!
//! Every remote domain the library can query implements [`LookupSource`].
//! The fan-out machinery only ever sees the trait, so adding a source never
//! touches the task or coordinator code.

use crate::error::{FanOutError, TransportError};
use crate::types::{LookupConfig, LookupKey, LookupPayload, SourceKind};
use async_trait::async_trait;
use std::sync::Arc;

/// Shared JSON-over-HTTP client used by the built-in sources
pub mod http;

/// GitHub user profiles
pub mod github;

/// Facebook Graph pages
pub mod facebook;

pub use facebook::FacebookSource;
pub use github::GitHubSource;

/// A remote service that can resolve a [`LookupKey`] into a payload.
///
/// Implementations are shared by every task of a fan-out, so they must be
/// safe to call from several tasks at the same time.
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Short name reported on every result this source produces.
    fn name(&self) -> &str;

    /// Perform the remote call for `key`.
    async fn fetch(&self, key: &LookupKey) -> Result<LookupPayload, TransportError>;
}

/// Build one of the built-in sources.
///
/// `base_url` overrides the public endpoint, which is mostly useful for
/// pointing a source at a mirror or a local stub server.
pub fn build_source(
    kind: SourceKind,
    base_url: Option<&str>,
    config: &LookupConfig,
) -> Result<Arc<dyn LookupSource>, FanOutError> {
    let source: Arc<dyn LookupSource> = match kind {
        SourceKind::GitHub => {
            let base = base_url.unwrap_or(github::DEFAULT_BASE_URL);
            Arc::new(GitHubSource::with_base_url(base, config)?)
        }
        SourceKind::Facebook => {
            let base = base_url.unwrap_or(facebook::DEFAULT_BASE_URL);
            Arc::new(FacebookSource::with_base_url(base, config)?)
        }
    };
    Ok(source)
}

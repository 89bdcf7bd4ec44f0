//! GitHub user lookups.

use super::http::JsonClient;
use super::LookupSource;
use crate::error::{FanOutError, TransportError};
use crate::types::{LookupConfig, LookupKey, LookupPayload};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Subset of the GitHub user document we care about.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: Option<String>,
    name: Option<String>,
    blog: Option<String>,
    html_url: Option<String>,
}

impl From<GitHubUser> for LookupPayload {
    fn from(user: GitHubUser) -> Self {
        LookupPayload {
            name: user.name,
            // GitHub reports an unset blog as an empty string
            website: user.blog.filter(|b| !b.is_empty()),
            login: user.login,
            profile_url: user.html_url,
        }
    }
}

/// Looks up GitHub users via `GET /users/{key}`.
#[derive(Clone)]
pub struct GitHubSource {
    client: JsonClient,
}

impl GitHubSource {
    pub fn new(config: &LookupConfig) -> Result<Self, FanOutError> {
        Self::with_base_url(DEFAULT_BASE_URL, config)
    }

    pub fn with_base_url(base_url: &str, config: &LookupConfig) -> Result<Self, FanOutError> {
        Ok(Self {
            client: JsonClient::new(base_url, config)?,
        })
    }
}

#[async_trait]
impl LookupSource for GitHubSource {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch(&self, key: &LookupKey) -> Result<LookupPayload, TransportError> {
        let user: GitHubUser = self
            .client
            .get_json(&["users", key.as_str()], key.as_str())
            .await?;
        Ok(user.into())
    }
}

//! Facebook Graph page lookups.

use super::http::JsonClient;
use super::LookupSource;
use crate::error::{FanOutError, TransportError};
use crate::types::{LookupConfig, LookupKey, LookupPayload};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://graph.facebook.com";

#[derive(Debug, Deserialize)]
struct GraphPage {
    name: Option<String>,
    website: Option<String>,
    username: Option<String>,
    link: Option<String>,
}

impl From<GraphPage> for LookupPayload {
    fn from(page: GraphPage) -> Self {
        LookupPayload {
            name: page.name,
            website: page.website,
            login: page.username,
            profile_url: page.link,
        }
    }
}

/// Looks up public pages via `GET /{key}` on the Graph API.
#[derive(Clone)]
pub struct FacebookSource {
    client: JsonClient,
}

impl FacebookSource {
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
impl LookupSource for FacebookSource {
    fn name(&self) -> &str {
        "facebook"
    }

    async fn fetch(&self, key: &LookupKey) -> Result<LookupPayload, TransportError> {
        let page: GraphPage = self.client.get_json(&[key.as_str()], key.as_str()).await?;
        Ok(page.into())
    }
}

//! Thin JSON-over-HTTP wrapper shared by the built-in sources.

use crate::error::{FanOutError, TransportError};
use crate::types::LookupConfig;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Connect timeout for the underlying HTTP client; the per-task timeout is
/// enforced separately by the task.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client bound to one base URL.
///
/// `reqwest::Client` pools connections internally and is safe to share
/// between tasks, so one instance serves the whole fan-out.
#[derive(Clone)]
pub struct JsonClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl JsonClient {
    pub fn new(base_url: &str, config: &LookupConfig) -> Result<Self, FanOutError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| FanOutError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FanOutError::config(format!(
                "Invalid base URL '{}': cannot carry a path",
                base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FanOutError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build `{base_url}/{segments...}`, percent-encoding each segment so
    /// `/`, `?` and `#` inside it stay part of that segment.
    pub fn url_for(&self, segments: &[&str], key: &str) -> Result<Url, TransportError> {
        // The url crate silently drops dot segments instead of encoding them.
        if segments.iter().any(|s| matches!(*s, "." | "..")) {
            return Err(TransportError::request(
                key,
                "'.' and '..' cannot be used as a path segment",
            ));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::request(key, "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET the URL made of `segments` and decode the body as `T`.
    ///
    /// `key` is only used to label errors.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        key: &str,
    ) -> Result<T, TransportError> {
        let url = self.url_for(segments, key)?;
        tracing::debug!(key, %url, "sending lookup request");

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(key, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(key, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(key, &e))?;

        serde_json::from_slice(&body).map_err(|e| TransportError::parse(key, e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Local server echoing the request path back as `path` and `name`.
    pub(crate) fn spawn_echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut buf = [0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("");
                let body = serde_json::json!({ "path": path, "name": path }).to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = JsonClient::new("https://api.github.com/", &LookupConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://api.github.com/");

        let client = JsonClient::new("http://localhost:9000/api/", &LookupConfig::default()).unwrap();
        let url = client.url_for(&["users", "octocat"], "octocat").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/users/octocat");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            JsonClient::new("not a url", &LookupConfig::default()),
            Err(FanOutError::Config { .. })
        ));
        assert!(JsonClient::new("mailto:someone@example.com", &LookupConfig::default()).is_err());
    }

    #[test]
    fn test_key_stays_within_its_segment() {
        let client = JsonClient::new("https://api.github.com", &LookupConfig::default()).unwrap();

        let url = client.url_for(&["users", "../orgs/spring-projects"], "k").unwrap();
        assert_eq!(url.path(), "/users/..%2Forgs%2Fspring-projects");
        assert!(url.query().is_none());

        let url = client.url_for(&["users", "a?x=1#frag"], "k").unwrap();
        assert_eq!(url.path(), "/users/a%3Fx=1%23frag");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_dot_segments_rejected() {
        let client = JsonClient::new("https://api.github.com", &LookupConfig::default()).unwrap();
        for key in [".", ".."] {
            let err = client.url_for(&["users", key], key).unwrap_err();
            assert!(matches!(err, TransportError::Request { .. }));
            assert_eq!(err.key(), key);
        }
    }

    #[tokio::test]
    async fn test_request_path_is_escaped_on_the_wire() {
        let client = JsonClient::new(&spawn_echo_server(), &LookupConfig::default()).unwrap();

        for (key, expected) in [
            ("../orgs/spring-projects", "/users/..%2Forgs%2Fspring-projects"),
            ("octocat#evil", "/users/octocat%23evil"),
            ("a?x=1", "/users/a%3Fx=1"),
        ] {
            let echoed: serde_json::Value =
                client.get_json(&["users", key], key).await.unwrap();
            assert_eq!(echoed["path"], expected, "key {:?}", key);
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 1 on loopback refuses connections without touching the network.
        let client = JsonClient::new("http://127.0.0.1:1", &LookupConfig::default()).unwrap();
        let err = client
            .get_json::<serde_json::Value>(&["users", "octocat"], "octocat")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network { .. }));
        assert_eq!(err.key(), "octocat");
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::rate_limit::SlidingWindowLimiter;

/// Resolves a source-track URL to the equivalent track id in the target
/// catalog via a third-party cross-catalog link resolver. A 404 is a
/// definitive negative answer, not an error.
#[async_trait]
pub trait UniversalLinkClient: Send + Sync {
    async fn resolve(&self, source_track_url: &str, target_platform: &str) -> Result<Option<String>>;
}

#[derive(Deserialize)]
struct LinksResponse {
    #[serde(rename = "linksByPlatform")]
    links_by_platform: HashMap<String, PlatformLink>,
}

#[derive(Deserialize)]
struct PlatformLink {
    #[serde(rename = "entityUniqueId")]
    entity_unique_id: String,
}

/// `reqwest`-backed client against the universal-link service, rate-limited
/// by a shared `SlidingWindowLimiter` (default 10 requests/60s).
pub struct HttpUniversalLinkClient {
    client: Client,
    api_base: String,
    limiter: Arc<SlidingWindowLimiter>,
}

impl HttpUniversalLinkClient {
    pub fn new(api_base: impl Into<String>, limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            limiter,
        }
    }
}

#[async_trait]
impl UniversalLinkClient for HttpUniversalLinkClient {
    async fn resolve(&self, source_track_url: &str, target_platform: &str) -> Result<Option<String>> {
        self.limiter.acquire().await;

        let encoded_url = urlencoding::encode(source_track_url);
        let url = format!(
            "{}/links?url={encoded_url}&userCountry=US",
            self.api_base
        );
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("universal-link request failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("universal-link service error: {status}");
        }

        let body: LinksResponse = response
            .json()
            .await
            .context("failed to parse universal-link response")?;

        let Some(link) = body.links_by_platform.get(target_platform) else {
            return Ok(None);
        };

        // Entity ids are of the form "TARGET::<id>"; the id is the part
        // after the last "::".
        let id = link
            .entity_unique_id
            .rsplit("::")
            .next()
            .unwrap_or(&link.entity_unique_id)
            .to_string();
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn not_found_is_a_definitive_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(60)));
        let client = HttpUniversalLinkClient::new(server.uri(), limiter);
        let result = client.resolve("https://open.spotify.com/track/1", "tidal").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn parses_entity_unique_id_suffix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "linksByPlatform": {
                    "tidal": { "entityUniqueId": "TIDAL::200" }
                }
            })))
            .mount(&server)
            .await;

        let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(60)));
        let client = HttpUniversalLinkClient::new(server.uri(), limiter);
        let result = client.resolve("https://open.spotify.com/track/1", "tidal").await.unwrap();
        assert_eq!(result.as_deref(), Some("200"));
    }
}

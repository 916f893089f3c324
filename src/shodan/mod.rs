//! Shodan host search client.

pub mod types;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::SearchCredential;
use types::{SearchResponse, SearchResults};

const API_BASE: &str = "https://api.shodan.io";

#[derive(Debug, thiserror::Error)]
pub enum ShodanError {
    #[error("SHODAN_API_KEY not set")]
    ApiKeyNotSet,

    /// Shown to the user as-is: the provider's own message, no prefix.
    #[error("{message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid Shodan URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unexpected response from Shodan: {0}")]
    InvalidResponse(String),
}

#[derive(Clone)]
pub struct ShodanClient {
    http: Client,
    api_key: SearchCredential,
    base_url: String,
}

impl ShodanClient {
    pub fn new(http: Client, credential: &SearchCredential) -> Result<Self, ShodanError> {
        if credential.is_empty() {
            return Err(ShodanError::ApiKeyNotSet);
        }
        Ok(Self {
            http,
            api_key: credential.clone(),
            base_url: API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: SearchCredential::new("test-key"),
            base_url: base_url.to_string(),
        }
    }

    /// Run `query` through Shodan's host search and return the first result page.
    pub async fn search(&self, query: &str) -> Result<SearchResults, ShodanError> {
        let url = Url::parse_with_params(
            &format!("{}/shodan/host/search", self.base_url),
            [("key", self.api_key.expose()), ("query", query)],
        )?;

        // The key travels in the query string, so errors must not carry the URL.
        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await
            .map_err(|e| ShodanError::Network(e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ShodanError::Network(e.without_url()))?;

        let body = serde_json::from_str::<SearchResponse>(&text);

        if !status.is_success() {
            let message = body
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| extract_error_message(&text, status));
            warn!(status = %status, "Shodan API error");
            return Err(ShodanError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body = body.map_err(|e| ShodanError::InvalidResponse(e.to_string()))?;
        if let Some(message) = body.error {
            warn!("Shodan API error in 200 response");
            return Err(ShodanError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let results = SearchResults {
            total: body.total.unwrap_or(0),
            matches: body.matches.unwrap_or_default(),
        };
        debug!(total = results.total, page = results.matches.len(), "shodan search complete");
        Ok(results)
    }
}

/// Non-JSON error bodies (proxies, HTML error pages) are reduced to a short snippet.
fn extract_error_message(body: &str, status: reqwest::StatusCode) -> String {
    let snippet: String = body.trim().chars().take(200).collect();
    if snippet.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {snippet}")
    }
}

// Aggregator REST client — a thin reqwest wrapper over the third-party
// multi-platform API.
//
// Every endpoint answers with a `{code, data}` envelope where code 200
// means success. Anything else — transport failure, HTTP error, non-200
// envelope, malformed body — collapses to None: callers treat that as
// "no data, try the next tier" and never retry.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

/// Default base URL of the aggregator API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.tikhub.io";

/// Desktop browser user agent sent on every outbound request; several
/// upstream endpoints reject non-browser agents outright.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36";

pub struct HubClient {
    client: reqwest::Client,
    base_url: String,
}

impl HubClient {
    /// Create a client for the given base URL. The bearer key may be empty
    /// — requests still go out, they just hit the unauthenticated quota.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !api_key.is_empty() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("API key contains invalid header characters")?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET an endpoint and return the `data` payload iff the envelope
    /// carries code 200. All failure modes are None, by design — the
    /// fallback chain is the error handler.
    pub async fn get_data(&self, endpoint: &str, params: &[(&str, String)]) -> Option<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(endpoint, "aggregator GET");

        let response = match self.client.get(&url).query(params).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(endpoint, error = %e, "aggregator request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(endpoint, status = %response.status(), "aggregator HTTP error");
            return None;
        }

        let body: Value = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                debug!(endpoint, error = %e, "aggregator body was not JSON");
                return None;
            }
        };
        if body.get("code").and_then(Value::as_i64) != Some(200) {
            debug!(endpoint, code = ?body.get("code"), "aggregator envelope not OK");
            return None;
        }
        body.get("data").cloned()
    }

    /// Follow a short link's redirects and return the final URL. Used for
    /// share links that hide the account id behind a hop.
    pub async fn resolve_redirect(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .ok()?;
        Some(response.url().to_string())
    }
}

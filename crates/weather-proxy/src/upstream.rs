use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Failure modes of a single upstream attempt. No retries — retry policy
/// belongs to the caller, and this service deliberately has none.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The provider answered with a non-success status.
    #[error("upstream returned status {0}")]
    Unavailable(u16),
    /// The request itself failed (timeout, DNS, connection reset). The
    /// wrapped error has its URL stripped so the embedded credential cannot
    /// surface in logs.
    #[error("upstream unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
}

/// HTTP client for the external weather provider.
///
/// The provider credential is injected at construction and only ever
/// appears inside the outgoing request URL.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| panic!("failed to build HTTP client: {e}"));

        Self {
            http,
            base_url,
            api_key,
        }
    }

    /// Fetch current weather for a coordinate pair, passed through as the
    /// exact strings received. Returns the provider's JSON document verbatim.
    pub async fn fetch(&self, lat: &str, lon: &str) -> Result<Bytes, UpstreamError> {
        let url = format!(
            "{}/data/2.5/weather?lat={}&lon={}&appid={}",
            self.base_url.trim_end_matches('/'),
            lat,
            lon,
            self.api_key,
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Unavailable(status.as_u16()));
        }

        resp.bytes()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.without_url()))
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("bio-terminal/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("invalid JSON: {0}")]
    Decode(String),
}

/// Source of JSON documents; the HTTP client in production, canned data in tests.
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

#[derive(Clone, Debug)]
pub struct HttpJsonSource {
    client: Client,
}

impl HttpJsonSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JsonSource for HttpJsonSource {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|error| FetchError::Decode(error.to_string()))
    }
}

/// Appends a cache-busting `t` query parameter, as the page did for its stats file.
pub fn with_cache_buster(url: &str, stamp: i64) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().append_pair("t", &stamp.to_string());
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

//! HTTP seam for `api` prefill sources

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{PrefillError, Result};

/// Issues a GET and returns the JSON body
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}

#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("forms-prefill/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "prefill response");

        if !status.is_success() {
            return Err(PrefillError::Status { status: status.as_u16(), url: url.to_string() });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

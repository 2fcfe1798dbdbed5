//! Repository access over HTTP

use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use matlib_common::{MaterialPatch, MaterialRecord, PresetBook};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("matlib-client/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the session resolves SKUs to records
#[async_trait]
pub trait MaterialSource: Send + Sync {
    async fn fetch(&self, sku: &str) -> ClientResult<MaterialRecord>;
}

/// Client for the matlib-server HTTP surface
#[derive(Debug, Clone)]
pub struct HttpRepositoryClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRepositoryClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(http_client, base_url))
    }

    pub fn with_client(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Merge `patch` into an existing record
    pub async fn update(&self, sku: &str, patch: &MaterialPatch) -> ClientResult<MaterialRecord> {
        let response = self
            .http_client
            .put(self.url(&format!("/materials/{}", sku)))
            .json(patch)
            .send()
            .await?;
        read_json(response, sku).await
    }

    /// Stored presets of `project`
    pub async fn fetch_presets(&self, project: &str) -> ClientResult<PresetBook> {
        let url = self.url(&format!("/presets/{}", project));
        tracing::debug!(project = %project, url = %url, "Fetching presets");
        let response = self.http_client.get(&url).send().await?;
        read_json(response, project).await
    }

    pub async fn save_presets(&self, project: &str, book: &PresetBook) -> ClientResult<()> {
        let response = self
            .http_client
            .put(self.url(&format!("/presets/{}", project)))
            .json(book)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response, project).await);
        }
        Ok(())
    }
}

#[async_trait]
impl MaterialSource for HttpRepositoryClient {
    async fn fetch(&self, sku: &str) -> ClientResult<MaterialRecord> {
        let url = self.url(&format!("/materials/{}", sku));
        tracing::debug!(sku = %sku, url = %url, "Fetching material");
        let response = self.http_client.get(&url).send().await?;
        read_json(response, sku).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, key: &str) -> ClientResult<T> {
    if !response.status().is_success() {
        return Err(status_error(response, key).await);
    }
    Ok(response.json().await?)
}

async fn status_error(response: reqwest::Response, key: &str) -> ClientError {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return ClientError::NotFound(key.to_string());
    }
    let body = response.text().await.unwrap_or_default();
    ClientError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    }
}

/// `error.message` of a server error body, or the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

// src/api/client.rs
//! HTTP asset retrieval.
//!
//! A thin wrapper around reqwest that fetches image buffers and mesh
//! documents. Status handling and body parsing live in [`super::parser`].

use super::parser::{check_status, parse_mesh_response};
use crate::algebras::{AssetSource, FetchError};
use crate::error::AppError;
use crate::model::Mesh;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

const USER_AGENT: &str = concat!("capture-prefetch/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Asset source backed by plain HTTP GET requests.
#[derive(Clone)]
pub struct HttpAssetClient {
    client: Client,
}

impl HttpAssetClient {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GETs `url` and returns the body of a successful response.
    async fn get(&self, url: &Url) -> Result<ApiResponse<Vec<u8>>, FetchError> {
        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        let response = ApiResponse {
            data: body,
            status,
            url: url.to_string(),
        };
        check_status(&response)?;
        Ok(response)
    }

    /// Runs `self.get(url)` unless `abort` fires first.
    async fn get_or_abort(
        &self,
        url: &Url,
        abort: CancellationToken,
    ) -> Result<ApiResponse<Vec<u8>>, FetchError> {
        tokio::select! {
            biased;
            _ = abort.cancelled() => Err(FetchError::Aborted { url: url.to_string() }),
            response = self.get(url) => response,
        }
    }
}

#[async_trait]
impl AssetSource for HttpAssetClient {
    async fn fetch_image_buffer(
        &self,
        url: &Url,
        abort: CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self.get_or_abort(url, abort).await?;
        if response.data.is_empty() {
            return Err(FetchError::MalformedResponse {
                reason: format!("empty image body from {}", response.url),
            });
        }
        Ok(response.data)
    }

    async fn fetch_mesh(&self, url: &Url, abort: CancellationToken) -> Result<Mesh, FetchError> {
        let response = self.get_or_abort(url, abort).await?;
        parse_mesh_response(response)
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

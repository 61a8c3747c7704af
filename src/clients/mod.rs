//! Image server client module

use crate::config::AppConfig;
use crate::errors::{FetchError, FetchResult};
use crate::request::ImageQuery;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Raw body chunks of one response, in arrival order
pub type ByteStream = BoxStream<'static, FetchResult<Bytes>>;

/// Anything that can open the chunked NDJSON body for a query.
///
/// Returning `Ok` means the response was accepted; a non-success status must
/// surface as `Err` without any body being read.
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn open(&self, query: &ImageQuery) -> FetchResult<ByteStream>;
}

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &AppConfig) -> FetchResult<Self> {
        // No overall timeout: a timeline stream stays open until the server ends it.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// Streaming client for the `/api/v1/*` image endpoints
pub struct HttpImageClient {
    http_client: HttpClient,
    base_url: Url,
}

impl HttpImageClient {
    pub fn new(config: &AppConfig) -> FetchResult<Self> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            base_url: config.api_base_url.clone(),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl ByteSource for HttpImageClient {
    async fn open(&self, query: &ImageQuery) -> FetchResult<ByteStream> {
        let url = query.url(&self.base_url)?;
        debug!(%url, "requesting image stream");

        let resp = self
            .http_client
            .get_client()
            .get(url)
            .header(reqwest::header::ACCEPT, "application/x-ndjson")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }

        Ok(resp.bytes_stream().map_err(FetchError::from).boxed())
    }
}

//! HTTP JSON RPC transport.
//!
//! HTTP has no push channel, so subscriptions are not supported by this
//! transport.

use crate::{
    jsonrpc,
    transport::{Transport, TransportError},
};
use async_trait::async_trait;
use reqwest::{header, StatusCode, Url};
use serde_json::Value;
use std::env;
use thiserror::Error;
use tracing::trace;

pub use reqwest;

/// An Ethereum JSON RPC HTTP transport.
#[derive(Clone, Debug)]
pub struct Client {
    client: reqwest::Client,
    url: Url,
}

impl Client {
    /// Creates a new JSON RPC HTTP client for the specified URL with the
    /// default HTTP client.
    pub fn new(url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Creates a new JSON RPC HTTP client for the specified client instance and
    /// URL.
    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    /// Creates a new JSON RPC HTTP client from the `NODE_URL` environment
    /// variable. This is useful for testing.
    pub fn from_env() -> Result<Self, TransportError> {
        let url = env::var("NODE_URL").map_err(TransportError::other)?;
        let url = url.parse::<Url>().map_err(TransportError::other)?;
        Ok(Self::new(url))
    }

    async fn roundtrip(&self, request: String) -> Result<String, Error> {
        trace!(url = %self.url, %request, "posting JSON RPC request");
        let response = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status, response.text().await?));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Transport for Client {
    async fn send(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        jsonrpc::call_async(method, params, |request| async move {
            self.roundtrip(request).await.map_err(TransportError::from)
        })
        .await
    }
}

/// An HTTP transport error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0} error: {1}")]
    Status(StatusCode, String),
}

impl From<Error> for TransportError {
    fn from(err: Error) -> Self {
        Self::other(err)
    }
}

//! Transport boundary: perform one HTTP request
//!
//! The engine never talks to the network directly. It hands a fully built
//! [`RequestInit`] to a [`Transport`] and gets back status, headers and a
//! lazily readable body. [`ReqwestTransport`] is the production transport.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::http::headers::HeaderSet;
use crate::response::RawResponse;

/// Extra transport options, merged client-wide then per call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Per-request timeout enforced by the transport
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overlay `other` on top of these options
    pub fn merged(&self, other: &FetchOptions) -> FetchOptions {
        FetchOptions {
            timeout: other.timeout.or(self.timeout),
        }
    }
}

/// Everything a transport needs to perform a request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInit {
    pub method: Method,
    pub url: String,
    pub headers: HeaderSet,
    pub body: Option<String>,
    pub fetch_options: FetchOptions,
}

/// Performs a single HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request.
    ///
    /// Non-2xx statuses are successful results; only failures to get a
    /// response at all are errors.
    async fn perform(&self, request: RequestInit) -> Result<RawResponse>;
}

/// Configuration for [`ReqwestTransport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Default request timeout in seconds, `None` to wait indefinitely
    pub timeout_secs: Option<u64>,
    /// Whether to validate TLS certificates
    pub validate_tls: bool,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            validate_tls: true,
            user_agent: format!("halwalk/{}", crate::VERSION),
        }
    }
}

/// Transport backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Create a transport from configuration
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(!config.validate_tls);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build().map_err(|e| Error::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: RequestInit) -> Result<RawResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);

        for (name, value) in &request.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => builder = builder.header(name, value),
                _ => tracing::debug!("skipping invalid header {}", name),
            }
        }
        if let Some(timeout) = request.fetch_options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        tracing::trace!("{} {}", request.method, request.url);
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = async move { response.text().await.map_err(Error::from) }.boxed();

        Ok(RawResponse { status, headers, body })
    }
}

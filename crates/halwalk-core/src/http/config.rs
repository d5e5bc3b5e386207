//! Client configuration
//!
//! Built in code with the `with_*` helpers or read from the environment
//! with [`ClientConfig::from_env`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::dispatch::{Handlers, LogSink};
use crate::error::{Error, Result};
use crate::http::transport::{FetchOptions, TransportConfig};
use crate::response::Response;

/// Hook applied to every transport response before it enters a chain
pub type ResponseTransformer = Arc<dyn Fn(Response) -> Response + Send + Sync>;

/// Environment variable holding the base URL
pub const ENV_BASE_URL: &str = "HALWALK_BASE_URL";
/// Environment variable enabling the unsafe request queue
pub const ENV_QUEUE_UNSAFE: &str = "HALWALK_QUEUE_UNSAFE_REQUESTS";
/// Environment variable holding the transport timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "HALWALK_TIMEOUT_SECS";

/// Configuration for a [`HalClient`](crate::HalClient)
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Base that relative hrefs and URLs are resolved against
    pub base_url: Option<Url>,
    /// Serialize PUT/POST/PATCH/DELETE requests
    pub queue_unsafe_requests: bool,
    /// Headers sent with every request
    pub headers: HashMap<String, String>,
    /// Transport options applied to every request
    pub fetch_options: FetchOptions,
    /// Fallback handlers consulted after the local ones
    pub on: Handlers,
    /// Applied to each transport response
    pub response_transformer: Option<ResponseTransformer>,
    /// Sink for unhandled-status errors, `tracing::error!` when unset
    pub log_error: Option<LogSink>,
    /// Sink for unhandled-status diagnostics, `tracing::debug!` when unset
    pub log_debug: Option<LogSink>,
    /// Settings for the default reqwest transport
    pub transport: TransportConfig,
}

impl ClientConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the environment, loading `.env` first
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();

        if let Ok(base) = std::env::var(ENV_BASE_URL) {
            config = config.with_base_url(&base)?;
        }
        if let Ok(flag) = std::env::var(ENV_QUEUE_UNSAFE) {
            config.queue_unsafe_requests = parse_flag(&flag).ok_or_else(|| Error::Configuration {
                message: format!("{} must be true or false, got '{}'", ENV_QUEUE_UNSAFE, flag),
            })?;
        }
        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs = secs.trim().parse::<u64>().map_err(|e| Error::Configuration {
                message: format!("{} must be a number of seconds: {}", ENV_TIMEOUT_SECS, e),
            })?;
            config.transport.timeout_secs = Some(secs);
        }

        Ok(config)
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|e| Error::InvalidUrl {
            url: base.to_string(),
            message: e.to_string(),
        })?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Enable or disable the unsafe request queue
    pub fn with_queue_unsafe_requests(mut self, enabled: bool) -> Self {
        self.queue_unsafe_requests = enabled;
        self
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set client-wide transport options
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    /// Set a client-wide transport timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_options.timeout = Some(timeout);
        self
    }

    /// Set the global fallback handlers
    pub fn with_handlers(mut self, handlers: Handlers) -> Self {
        self.on = handlers;
        self
    }

    /// Set the response transformer
    pub fn with_response_transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.response_transformer = Some(Arc::new(transformer));
        self
    }

    /// Route unhandled-status errors to `sink`
    pub fn with_log_error<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log_error = Some(Arc::new(sink));
        self
    }

    /// Route unhandled-status diagnostics to `sink`
    pub fn with_log_debug<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log_debug = Some(Arc::new(sink));
        self
    }

    /// Set the reqwest transport settings
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("queue_unsafe_requests", &self.queue_unsafe_requests)
            .field("headers", &self.headers)
            .field("fetch_options", &self.fetch_options)
            .field("on", &self.on)
            .field("response_transformer", &self.response_transformer.is_some())
            .field("transport", &self.transport)
            .finish()
    }
}

//! HAL client issuing requests and owning per-instance state
//!
//! Each [`HalClient`] owns its own GET deduplication cache, unsafe request
//! queue, global handlers and headers. Clones share that state; separately
//! constructed clients never do.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::hal;
use crate::http::cache::RequestCache;
use crate::http::headers::{compute_headers, MethodClass};
use crate::http::sequencer::Sequencer;
use crate::http::transport::{FetchOptions, RequestInit, ReqwestTransport, Transport};
use crate::http::ClientConfig;
use crate::pending::{Outcome, Pending};
use crate::response::{Reply, RequestContext, Response};

/// What a verb is aimed at: a URL, or a representation whose self link
/// supplies the URL
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Url(String),
    Representation(Value),
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Target::Url(url.to_string())
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Target::Url(url)
    }
}

impl From<&String> for Target {
    fn from(url: &String) -> Self {
        Target::Url(url.clone())
    }
}

impl From<Value> for Target {
    fn from(representation: Value) -> Self {
        Target::Representation(representation)
    }
}

impl From<&Value> for Target {
    fn from(representation: &Value) -> Self {
        Target::Representation(representation.clone())
    }
}

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Headers overriding the defaults and the client-wide headers
    pub headers: HashMap<String, String>,
    /// Transport options overriding the client-wide ones
    pub fetch_options: FetchOptions,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header for this call
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set transport options for this call
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    /// Set a timeout for this call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_options.timeout = Some(timeout);
        self
    }
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    dispatcher: Arc<Dispatcher>,
    cache: RequestCache,
    sequencer: Sequencer,
}

/// HAL client
#[derive(Clone)]
pub struct HalClient {
    inner: Arc<ClientInner>,
}

impl HalClient {
    /// Create a client backed by the reqwest transport
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.transport)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client from `HALWALK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            &config.on,
            config.log_error.clone(),
            config.log_debug.clone(),
        ));
        let sequencer = Sequencer::new(config.queue_unsafe_requests);
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                dispatcher,
                cache: RequestCache::default(),
                sequencer,
            }),
        }
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Number of GET requests currently in flight
    pub fn in_flight_gets(&self) -> usize {
        self.inner.cache.len()
    }

    pub(crate) fn dispatcher(&self) -> Arc<Dispatcher> {
        self.inner.dispatcher.clone()
    }

    /// Resolve an href against the configured base URL.
    ///
    /// Without a base URL the href is used as given.
    pub fn resolve_url(&self, href: &str) -> Result<String> {
        match &self.inner.config.base_url {
            Some(base) => base
                .join(href)
                .map(String::from)
                .map_err(|e| Error::InvalidUrl {
                    url: href.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(href.to_string()),
        }
    }

    fn target_url(&self, target: &Target) -> Result<String> {
        let href = match target {
            Target::Url(url) => url.clone(),
            Target::Representation(representation) => {
                hal::self_link(representation).ok_or_else(|| Error::MissingUrl {
                    target: "a representation without a self link".to_string(),
                })?
            }
        };
        if href.trim().is_empty() {
            return Err(Error::MissingUrl {
                target: "an empty URL".to_string(),
            });
        }
        self.resolve_url(&href)
    }

    /// Issue a request with any method.
    ///
    /// GETs join an identical in-flight GET when there is one. PUT, POST,
    /// PATCH and DELETE go through the unsafe request queue when it is
    /// enabled. The body is only sent for non-GET/HEAD methods.
    ///
    /// Fails synchronously when the target yields no usable URL or the
    /// body cannot be serialized.
    pub fn request(
        &self,
        method: Method,
        target: impl Into<Target>,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Pending> {
        let url = self.target_url(&target.into())?;
        let config = &self.inner.config;
        let class = MethodClass::of(&method);

        let headers = compute_headers(&method, &config.headers, &options.headers);
        let body = match class {
            MethodClass::Safe => None,
            _ => body.map(serde_json::to_string).transpose()?,
        };
        let init = RequestInit {
            method: method.clone(),
            url: url.clone(),
            headers,
            body,
            fetch_options: config.fetch_options.merged(&options.fetch_options),
        };

        tracing::debug!("{} {}", method, url);
        let cache_key = RequestCache::key(&url, &init.headers);
        let send = self.send(init);
        let dispatcher = self.dispatcher();

        let pending = if method == Method::GET {
            self.inner.cache.get_or_launch(cache_key, send, dispatcher)
        } else if class == MethodClass::Safe {
            Pending::launch(send, dispatcher)
        } else {
            self.inner.sequencer.enqueue(send, dispatcher)
        };
        Ok(pending)
    }

    fn send(&self, init: RequestInit) -> impl std::future::Future<Output = Result<Outcome>> + Send + 'static {
        let transport = self.inner.transport.clone();
        let transformer = self.inner.config.response_transformer.clone();
        let context = RequestContext {
            method: init.method.clone(),
            url: init.url.clone(),
        };

        async move {
            let raw = transport.perform(init).await?;
            let mut response = Response::from_raw(raw, Some(context));
            if let Some(transform) = transformer {
                response = transform(response);
            }
            Ok(Outcome::Reply(Reply::Single(response)))
        }
    }

    /// GET a URL or a representation's self link
    pub fn get(&self, target: impl Into<Target>, options: &RequestOptions) -> Result<Pending> {
        self.request(Method::GET, target, None, options)
    }

    /// HEAD a URL or a representation's self link
    pub fn head(&self, target: impl Into<Target>, options: &RequestOptions) -> Result<Pending> {
        self.request(Method::HEAD, target, None, options)
    }

    /// PUT a JSON body
    pub fn put(&self, target: impl Into<Target>, body: &Value, options: &RequestOptions) -> Result<Pending> {
        self.request(Method::PUT, target, Some(body), options)
    }

    /// POST a JSON body
    pub fn post(&self, target: impl Into<Target>, body: &Value, options: &RequestOptions) -> Result<Pending> {
        self.request(Method::POST, target, Some(body), options)
    }

    /// PATCH with a JSON Patch body
    pub fn patch(&self, target: impl Into<Target>, body: &Value, options: &RequestOptions) -> Result<Pending> {
        self.request(Method::PATCH, target, Some(body), options)
    }

    /// DELETE a URL or a representation's self link
    pub fn delete(&self, target: impl Into<Target>, options: &RequestOptions) -> Result<Pending> {
        self.request(Method::DELETE, target, None, options)
    }

    /// Alias of [`HalClient::delete`]
    pub fn del(&self, target: impl Into<Target>, options: &RequestOptions) -> Result<Pending> {
        self.delete(target, options)
    }
}

impl fmt::Debug for HalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HalClient")
            .field("config", &self.inner.config)
            .field("in_flight_gets", &self.in_flight_gets())
            .field("queue_unsafe_requests", &self.inner.sequencer.is_enabled())
            .finish()
    }
}

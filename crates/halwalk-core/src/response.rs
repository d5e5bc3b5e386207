//! Response descriptors flowing through a dispatch chain
//!
//! A [`Response`] is either backed by a transport response or synthesized
//! (embedded resources, missing relations). Its body is read and parsed at
//! most once; every clone of a response shares the same memoized cells.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Method;
use serde_json::Value;

use crate::error::Result;

/// Lazily evaluated body text produced by a transport
pub type BodyReader = BoxFuture<'static, Result<String>>;

type TextCell = Shared<BoxFuture<'static, Option<Arc<str>>>>;
type ParsedCell = Shared<BoxFuture<'static, Value>>;

/// Dispatch status of a response
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// A real HTTP status code
    Code(u16),
    /// The requested relation was absent from the representation
    NoRelation {
        relation: String,
        representation: Value,
    },
    /// No usable status, only reachable through the `xxx` wildcard
    Unknown,
}

impl Status {
    /// Numeric code, if this is a real HTTP status
    pub fn code(&self) -> Option<u16> {
        match self {
            Status::Code(code) => Some(*code),
            _ => None,
        }
    }

    /// Key used in handler maps: `"404"`, `"norel"` or `"xxx"`
    pub fn key(&self) -> String {
        match self {
            Status::Code(code) => code.to_string(),
            Status::NoRelation { .. } => "norel".to_string(),
            Status::Unknown => "xxx".to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Method and URL of the request that produced a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: Method,
    pub url: String,
}

/// Status, headers and body as handed over by a transport
pub struct RawResponse {
    pub status: u16,
    /// Header names are expected lower-cased
    pub headers: HashMap<String, String>,
    pub body: BodyReader,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

struct Inner {
    status: Status,
    headers: HashMap<String, String>,
    request: Option<RequestContext>,
    text: TextCell,
    parsed: ParsedCell,
    unhandled: AtomicBool,
}

/// A single response descriptor
#[derive(Clone)]
pub struct Response {
    inner: Arc<Inner>,
}

impl Response {
    fn build(
        status: Status,
        headers: HashMap<String, String>,
        request: Option<RequestContext>,
        body: BoxFuture<'static, Option<Arc<str>>>,
    ) -> Self {
        let text = body.shared();
        let reader = text.clone();
        let parsed = async move {
            match reader.await {
                Some(text) if !text.trim().is_empty() => {
                    serde_json::from_str(&text).unwrap_or(Value::Null)
                }
                _ => Value::Null,
            }
        }
        .boxed()
        .shared();

        Self {
            inner: Arc::new(Inner {
                status,
                headers,
                request,
                text,
                parsed,
                unhandled: AtomicBool::new(false),
            }),
        }
    }

    /// Wrap a transport response
    pub fn from_raw(raw: RawResponse, request: Option<RequestContext>) -> Self {
        let RawResponse { status, headers, body } = raw;
        let body = async move {
            match body.await {
                Ok(text) => Some(Arc::<str>::from(text)),
                Err(err) => {
                    tracing::debug!("failed to read response body: {}", err);
                    None
                }
            }
        }
        .boxed();
        Self::build(Status::Code(status), headers, request, body)
    }

    /// A response with a fixed status and body text
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<String>) -> Self {
        let text: Arc<str> = Arc::from(body.into());
        Self::build(
            Status::Code(status),
            headers,
            None,
            futures::future::ready(Some(text)).boxed(),
        )
    }

    /// A synthetic 200 whose body is an embedded representation
    pub fn embedded(representation: Value) -> Self {
        let text: Arc<str> = Arc::from(representation.to_string());
        Self::build(
            Status::Code(200),
            HashMap::new(),
            None,
            futures::future::ready(Some(text)).boxed(),
        )
    }

    /// A synthetic `norel` response for a missing relation
    pub fn no_relation(relation: impl Into<String>, representation: Value) -> Self {
        Self::build(
            Status::NoRelation {
                relation: relation.into(),
                representation,
            },
            HashMap::new(),
            None,
            futures::future::ready(None).boxed(),
        )
    }

    /// Dispatch status
    pub fn status(&self) -> &Status {
        &self.inner.status
    }

    /// Response headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.inner.headers
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.inner
            .headers
            .iter()
            .find(|(key, _)| key.to_ascii_lowercase() == name)
            .map(|(_, value)| value.as_str())
    }

    /// The request that produced this response; `None` for synthetic ones
    pub fn request(&self) -> Option<&RequestContext> {
        self.inner.request.as_ref()
    }

    /// Relation and representation of a `norel` response
    pub fn no_relation_info(&self) -> Option<(&str, &Value)> {
        match &self.inner.status {
            Status::NoRelation { relation, representation } => Some((relation, representation)),
            _ => None,
        }
    }

    /// Body text, read from the transport on first use
    pub async fn text(&self) -> Option<String> {
        self.inner.text.clone().await.map(|text| text.to_string())
    }

    /// Parsed body; unreadable, empty or malformed bodies yield `null`
    pub async fn json(&self) -> Value {
        self.inner.parsed.clone().await
    }

    /// Whether two handles refer to the same response
    pub fn ptr_eq(&self, other: &Response) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.inner.status)
            .field("headers", &self.inner.headers)
            .field("request", &self.inner.request)
            .finish_non_exhaustive()
    }
}

/// Ordered responses of a follow-all
#[derive(Clone, Debug)]
pub struct ResponseSet {
    items: Arc<Vec<Response>>,
    unhandled: Arc<AtomicBool>,
}

impl ResponseSet {
    pub fn new(items: Vec<Response>) -> Self {
        Self {
            items: Arc::new(items),
            unhandled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Response> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Shared status of all items.
    ///
    /// An empty set is a successful empty collection; mixed statuses are
    /// only reachable through `xxx`.
    pub fn status(&self) -> Status {
        let mut statuses = self.items.iter().map(|item| item.status().key());
        match statuses.next() {
            None => Status::Code(200),
            Some(first) if statuses.all(|key| key == first) => self.items[0].status().clone(),
            Some(_) => Status::Unknown,
        }
    }
}

impl std::ops::Index<usize> for ResponseSet {
    type Output = Response;

    fn index(&self, index: usize) -> &Response {
        &self.items[index]
    }
}

/// What a request chain resolves to before handlers turn it into data
#[derive(Clone, Debug)]
pub enum Reply {
    Single(Response),
    Many(ResponseSet),
}

impl Reply {
    /// Status used to pick a handler
    pub fn status(&self) -> Status {
        match self {
            Reply::Single(response) => response.status().clone(),
            Reply::Many(set) => set.status(),
        }
    }

    /// The response, when this is a single reply
    pub fn single(&self) -> Option<&Response> {
        match self {
            Reply::Single(response) => Some(response),
            Reply::Many(_) => None,
        }
    }

    /// All responses, in order
    pub fn responses(&self) -> Vec<Response> {
        match self {
            Reply::Single(response) => vec![response.clone()],
            Reply::Many(set) => set.iter().cloned().collect(),
        }
    }

    /// Parsed body; a set parses to an array with one entry per item
    pub async fn json(&self) -> Value {
        match self {
            Reply::Single(response) => response.json().await,
            Reply::Many(set) => {
                let bodies = futures::future::join_all(set.iter().map(|r| r.json())).await;
                Value::Array(bodies)
            }
        }
    }

    fn unhandled_flag(&self) -> &AtomicBool {
        match self {
            Reply::Single(response) => &response.inner.unhandled,
            Reply::Many(set) => &set.unhandled,
        }
    }

    /// Whether a dispatch already gave up on this reply
    pub fn is_unhandled(&self) -> bool {
        self.unhandled_flag().load(Ordering::SeqCst)
    }

    /// Flag the reply as terminally unhandled; returns the previous state
    pub(crate) fn mark_unhandled(&self) -> bool {
        self.unhandled_flag().swap(true, Ordering::SeqCst)
    }

    /// Request context, if this reply came straight from the transport
    pub fn request(&self) -> Option<&RequestContext> {
        match self {
            Reply::Single(response) => response.request(),
            Reply::Many(_) => None,
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Single(response)
    }
}

impl From<Vec<Response>> for Reply {
    fn from(items: Vec<Response>) -> Self {
        Reply::Many(ResponseSet::new(items))
    }
}

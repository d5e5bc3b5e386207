//! Relation following
//!
//! Resolves a HAL relation of a representation either from `_embedded`
//! data, without touching the network, or by requesting the hrefs in
//! `_links`. A relation found in neither place resolves to a synthetic
//! `norel` response.

use std::collections::HashMap;

use futures::future::join_all;
use reqwest::Method;
use serde_json::Value;

use crate::client::{HalClient, RequestOptions};
use crate::error::{Error, Result};
use crate::hal::{self, Link};
use crate::http::headers::MethodClass;
use crate::http::transport::FetchOptions;
use crate::pending::{Outcome, Pending};
use crate::response::{Reply, Response, ResponseSet};
use crate::template::{self, Vars};

/// Options for [`HalClient::follow`]
#[derive(Debug, Clone)]
pub struct FollowOptions {
    /// Resolve every link or embedded item instead of the first
    pub follow_all: bool,
    /// Per-request headers
    pub headers: HashMap<String, String>,
    /// Per-request transport options
    pub fetch_options: FetchOptions,
    /// Variables for templated links
    pub vars: Vars,
    /// Method used for linked resources
    pub method: Method,
    /// Body sent with unsafe methods
    pub body: Option<Value>,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            follow_all: false,
            headers: HashMap::new(),
            fetch_options: FetchOptions::default(),
            vars: Vars::new(),
            method: Method::GET,
            body: None,
        }
    }
}

impl FollowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every link or embedded item
    pub fn all(mut self) -> Self {
        self.follow_all = true;
        self
    }

    /// Set one template variable
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Replace the template variables
    pub fn with_vars(mut self, vars: Vars) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    /// Request linked resources with `method` instead of GET
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Body for PUT, POST, PATCH and DELETE
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            headers: self.headers.clone(),
            fetch_options: self.fetch_options.clone(),
        }
    }
}

impl HalClient {
    /// Follow `relation` from `representation`.
    ///
    /// With GET, embedded data wins over links. A single follow yields the
    /// first item; with `follow_all` every item is resolved and the reply
    /// is a set in document order. A relation present in `_links` with no
    /// usable link resolves like an empty embedded list. Failures to issue
    /// a request surface as a rejected `Pending`.
    pub fn follow(&self, representation: &Value, relation: &str, options: FollowOptions) -> Pending {
        let dispatcher = self.dispatcher();

        if options.method == Method::GET {
            if let Some(items) = hal::embedded(representation, relation) {
                tracing::debug!("following embedded relation '{}'", relation);
                return Pending::ready(Ok(embedded_reply(items, options.follow_all).into()), dispatcher);
            }
        }

        let linked = representation
            .get(hal::LINKS)
            .and_then(|links| links.get(relation))
            .is_some();
        if !linked {
            tracing::debug!("relation '{}' not found", relation);
            let response = Response::no_relation(relation, representation.clone());
            return Pending::ready(Ok(response.into()), dispatcher);
        }

        // Present but without usable links: same shape as an empty embedded list
        let links = hal::links(representation, relation);
        if links.is_empty() {
            tracing::debug!("relation '{}' has no usable links", relation);
            return Pending::ready(Ok(embedded_reply(Vec::new(), options.follow_all).into()), dispatcher);
        }

        if !options.follow_all {
            return self.follow_link(&links[0], &options);
        }

        let requests: Vec<Pending> = links.iter().map(|link| self.follow_link(link, &options)).collect();
        tracing::debug!("following {} links for relation '{}'", requests.len(), relation);
        Pending::launch(settle_all(requests), dispatcher)
    }

    /// [`HalClient::follow`] with `follow_all` forced on
    pub fn follow_all(&self, representation: &Value, relation: &str, options: FollowOptions) -> Pending {
        self.follow(representation, relation, options.all())
    }

    /// Handler that follows `relation` from the body it receives
    pub fn then_follow(
        &self,
        relation: impl Into<String>,
        options: FollowOptions,
    ) -> impl Fn(Value, Reply) -> Pending + Send + Sync + 'static {
        let client = self.clone();
        let relation = relation.into();
        move |representation: Value, _: Reply| client.follow(&representation, &relation, options.clone())
    }

    /// Handler that follows every `relation` link from the body it receives
    pub fn then_follow_all(
        &self,
        relation: impl Into<String>,
        options: FollowOptions,
    ) -> impl Fn(Value, Reply) -> Pending + Send + Sync + 'static {
        self.then_follow(relation, options.all())
    }

    fn follow_link(&self, link: &Link, options: &FollowOptions) -> Pending {
        let href = if link.templated {
            template::expand(&link.href, &options.vars)
        } else {
            link.href.clone()
        };
        let body = match MethodClass::of(&options.method) {
            MethodClass::Safe => None,
            _ => options.body.as_ref(),
        };

        self.request(options.method.clone(), href, body, &options.request_options())
            .unwrap_or_else(|err| Pending::ready(Err(err), self.dispatcher()))
    }
}

fn embedded_reply(items: Vec<&Value>, follow_all: bool) -> Reply {
    if follow_all {
        let responses = items.into_iter().cloned().map(Response::embedded).collect();
        return Reply::Many(ResponseSet::new(responses));
    }
    let first = items.into_iter().next().cloned().unwrap_or(Value::Null);
    Reply::Single(Response::embedded(first))
}

/// Wait for every request, then resolve with all responses in order or
/// reject with every outcome if any failed
async fn settle_all(requests: Vec<Pending>) -> Result<Outcome> {
    let outcomes: Vec<Result<Response>> = join_all(requests)
        .await
        .into_iter()
        .map(|settled| settled.and_then(single_response))
        .collect();

    if outcomes.iter().any(|outcome| outcome.is_err()) {
        return Err(Error::FollowAll { outcomes });
    }
    let responses = outcomes.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(Outcome::Reply(Reply::Many(ResponseSet::new(responses))))
}

fn single_response(outcome: Outcome) -> Result<Response> {
    outcome
        .into_reply()
        .and_then(|reply| reply.single().cloned())
        .ok_or_else(|| Error::Transport {
            message: "request settled without a response".to_string(),
            source: None,
        })
}

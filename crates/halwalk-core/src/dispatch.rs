//! Status-driven handler dispatch
//!
//! A [`Handlers`] map routes a reply to a handler by status pattern:
//!
//! - exact codes: `"404"`
//! - two-digit wildcard: `"20x"`
//! - class wildcard: `"4xx"`
//! - full wildcard: `"xxx"`
//! - missing relation: `"norel"`
//! - alternatives: `"200|201|204"`
//!
//! Resolution tries the candidate keys for a status from most to least
//! specific against the local map, and only then repeats the whole list
//! against the client's global map. A local `xxx` therefore wins over a
//! global `5xx`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::pending::Outcome;
use crate::response::{Reply, Status};

/// Future produced by a handler
pub type Reaction = BoxFuture<'static, Result<Outcome>>;

/// A handler: parsed body (or array of bodies) plus the reply itself
pub type HandlerFn = Arc<dyn Fn(Value, Reply) -> Reaction + Send + Sync>;

/// Log sink for dispatch diagnostics
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Anything a handler may return
pub trait IntoReaction {
    fn into_reaction(self) -> Reaction;
}

impl<F> IntoReaction for F
where
    F: Future<Output = Result<Outcome>> + Send + 'static,
{
    fn into_reaction(self) -> Reaction {
        self.boxed()
    }
}

impl IntoReaction for Outcome {
    fn into_reaction(self) -> Reaction {
        futures::future::ready(Ok(self)).boxed()
    }
}

/// Handler map keyed by status pattern
#[derive(Clone, Default)]
pub struct Handlers {
    entries: Vec<(String, HandlerFn)>,
}

impl Handlers {
    /// Create an empty handler map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a status pattern
    pub fn on<F, R>(mut self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, Reply) -> R + Send + Sync + 'static,
        R: IntoReaction,
    {
        let handler: HandlerFn = Arc::new(move |body, reply| handler(body, reply).into_reaction());
        self.entries.push((pattern.into(), handler));
        self
    }

    /// Whether no handler has been registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split pipe-joined patterns into one exact entry each
    pub(crate) fn expand(&self) -> HandlerMap {
        let mut map = HashMap::new();
        for (pattern, handler) in &self.entries {
            for key in pattern.split('|').map(str::trim).filter(|k| !k.is_empty()) {
                map.insert(key.to_string(), handler.clone());
            }
        }
        HandlerMap(map)
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(pattern, _)| pattern))
            .finish()
    }
}

/// Expanded, exact-key handler map
#[derive(Clone, Default)]
pub(crate) struct HandlerMap(HashMap<String, HandlerFn>);

impl HandlerMap {
    fn find(&self, candidates: &[String]) -> Option<&HandlerFn> {
        candidates.iter().find_map(|key| self.0.get(key))
    }
}

/// Candidate keys for a status, most specific first
pub fn candidates(status: &Status) -> Vec<String> {
    match status {
        Status::Code(code) => {
            let exact = code.to_string();
            if exact.len() == 3 {
                vec![
                    exact.clone(),
                    format!("{}x", &exact[..2]),
                    format!("{}xx", &exact[..1]),
                    "xxx".to_string(),
                ]
            } else {
                vec![exact, "xxx".to_string()]
            }
        }
        Status::NoRelation { .. } => vec!["norel".to_string()],
        Status::Unknown => vec!["xxx".to_string()],
    }
}

/// Per-client dispatch state: the global fallback map and log sinks
pub(crate) struct Dispatcher {
    global: HandlerMap,
    log_error: Option<LogSink>,
    log_debug: Option<LogSink>,
}

impl Dispatcher {
    pub(crate) fn new(
        global: &Handlers,
        log_error: Option<LogSink>,
        log_debug: Option<LogSink>,
    ) -> Self {
        Self {
            global: global.expand(),
            log_error,
            log_debug,
        }
    }

    fn resolve(&self, local: &HandlerMap, status: &Status) -> Option<HandlerFn> {
        let candidates = candidates(status);
        local
            .find(&candidates)
            .or_else(|| self.global.find(&candidates))
            .cloned()
    }

    fn error(&self, message: &str) {
        match &self.log_error {
            Some(sink) => sink(message),
            None => tracing::error!("{}", message),
        }
    }

    fn debug(&self, message: &str) {
        match &self.log_debug {
            Some(sink) => sink(message),
            None => tracing::debug!("{}", message),
        }
    }

    fn report_unhandled(&self, status: &Status, reply: &Reply) {
        if let Status::NoRelation { relation, representation } = status {
            let dump = serde_json::to_string_pretty(representation).unwrap_or_default();
            self.error(&format!(
                "No handler for missing relation '{}' in representation:\n{}",
                relation, dump
            ));
        } else if let Some(request) = reply.request() {
            self.debug(&format!(
                "{} {} returned unhandled status {}",
                request.method, request.url, status
            ));
        } else {
            self.error(&format!("No handler for response status {}", status));
        }
    }

    /// Route a settled outcome through `local`, falling back to the globals
    pub(crate) async fn dispatch(&self, settled: Result<Outcome>, local: HandlerMap) -> Result<Outcome> {
        let reply = match settled? {
            Outcome::Reply(reply) => reply,
            other => return Ok(other),
        };
        let status = reply.status();

        if reply.is_unhandled() {
            return Err(Error::Unhandled { status: status.key(), reply });
        }

        let Some(handler) = self.resolve(&local, &status) else {
            if !reply.mark_unhandled() {
                self.report_unhandled(&status, &reply);
            }
            return Err(Error::Unhandled { status: status.key(), reply });
        };

        tracing::trace!("dispatching status {}", status);
        let body = reply.json().await;
        handler(body, reply).await
    }
}

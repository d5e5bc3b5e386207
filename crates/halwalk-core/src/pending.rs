//! The awaitable result of every client operation
//!
//! [`Pending`] is a cloneable future of `Result<Outcome>` with one extra
//! operation, [`Pending::on`], that routes the settled reply to a status
//! handler and yields a new `Pending` for the handler's result.
//!
//! Inside a Tokio runtime a `Pending` is started as soon as it is created,
//! so requests go out whether or not anyone awaits them. Outside a runtime
//! it runs when first polled.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{FutureExt, Shared};
use serde_json::Value;

use crate::dispatch::{Dispatcher, Handlers, Reaction};
use crate::error::Result;
use crate::response::{Reply, Response};

/// What a request chain settles to
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Nothing; `.on` on an empty outcome ends the chain silently
    Empty,
    /// Response(s) still waiting for a status handler
    Reply(Reply),
    /// Plain data returned by a handler
    Value(Value),
}

impl Outcome {
    /// The data carried by a `Value` outcome
    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The reply carried by a `Reply` outcome
    pub fn into_reply(self) -> Option<Reply> {
        match self {
            Outcome::Reply(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Outcome::Reply(reply)
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Reply(Reply::Single(response))
    }
}

impl From<Option<Value>> for Outcome {
    fn from(value: Option<Value>) -> Self {
        value.map(Outcome::Value).unwrap_or(Outcome::Empty)
    }
}

/// A request chain in flight
#[derive(Clone)]
pub struct Pending {
    future: Shared<Reaction>,
    dispatcher: Arc<Dispatcher>,
}

impl Pending {
    pub(crate) fn launch<F>(future: F, dispatcher: Arc<Dispatcher>) -> Self
    where
        F: Future<Output = Result<Outcome>> + Send + 'static,
    {
        let future = future.boxed().shared();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(future.clone());
        }
        Self { future, dispatcher }
    }

    pub(crate) fn ready(outcome: Result<Outcome>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            future: futures::future::ready(outcome).boxed().shared(),
            dispatcher,
        }
    }

    /// Attach status handlers.
    ///
    /// The returned `Pending` settles to whatever the matched handler
    /// returns. Transport errors and earlier rejections pass through
    /// without reaching any handler.
    ///
    /// Only replies are dispatched. A chain that already settled to
    /// [`Outcome::Value`] or [`Outcome::Empty`] passes through unchanged,
    /// so `.on` with an `xxx` handler after a value-returning handler
    /// does nothing.
    pub fn on(&self, handlers: Handlers) -> Pending {
        let local = handlers.expand();
        let source = self.future.clone();
        let dispatcher = self.dispatcher.clone();
        Pending::launch(
            async move {
                let settled = source.await;
                dispatcher.dispatch(settled, local).await
            },
            self.dispatcher.clone(),
        )
    }

    /// Whether both handles observe the same underlying operation
    pub fn ptr_eq(&self, other: &Pending) -> bool {
        self.future.ptr_eq(&other.future)
    }

    /// The settled result, if already available
    pub fn peek(&self) -> Option<&Result<Outcome>> {
        self.future.peek()
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }

    /// Await and return the handler data, if the chain ended in a value
    pub async fn value(self) -> Result<Option<Value>> {
        Ok(self.await?.into_value())
    }
}

impl Future for Pending {
    type Output = Result<Outcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("settled", &self.is_settled())
            .finish_non_exhaustive()
    }
}

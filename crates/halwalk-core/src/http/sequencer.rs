//! Optional serialization of unsafe requests
//!
//! When enabled, PUT/POST/PATCH/DELETE requests issued on one client run
//! strictly one after another in submission order. A failed request does
//! not stop the ones queued behind it.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::pending::{Outcome, Pending};

type Tail = Shared<BoxFuture<'static, ()>>;

pub(crate) struct Sequencer {
    enabled: bool,
    tail: Mutex<Option<Tail>>,
}

impl Sequencer {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            tail: Mutex::new(None),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run `request` once everything enqueued before it has settled
    pub(crate) fn enqueue<F>(&self, request: F, dispatcher: Arc<Dispatcher>) -> Pending
    where
        F: Future<Output = Result<Outcome>> + Send + 'static,
    {
        if !self.enabled {
            return Pending::launch(request, dispatcher);
        }

        let mut tail = self.tail.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = tail.take();
        let pending = Pending::launch(
            async move {
                if let Some(previous) = previous {
                    tracing::trace!("waiting for queued unsafe request");
                    previous.await;
                }
                request.await
            },
            dispatcher,
        );
        *tail = Some(pending.clone().map(|_| ()).boxed().shared());
        pending
    }
}

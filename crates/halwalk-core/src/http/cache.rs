//! GET request deduplication
//!
//! Concurrent GETs for the same URL and effective headers share one
//! transport call. An entry lives only while its request is in flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::http::headers::{fingerprint, HeaderSet};
use crate::pending::{Outcome, Pending};

type Entries = Arc<Mutex<HashMap<String, Pending>>>;

/// In-flight GET requests keyed by URL and header fingerprint
#[derive(Default)]
pub(crate) struct RequestCache {
    entries: Entries,
}

fn lock(entries: &Mutex<HashMap<String, Pending>>) -> MutexGuard<'_, HashMap<String, Pending>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RequestCache {
    /// Cache key: the URL followed by the sorted header pairs
    pub(crate) fn key(url: &str, headers: &HeaderSet) -> String {
        format!("{} {}", url, fingerprint(headers))
    }

    /// Return the in-flight request for `key`, or launch `request` and
    /// track it until it settles
    pub(crate) fn get_or_launch<F>(&self, key: String, request: F, dispatcher: Arc<Dispatcher>) -> Pending
    where
        F: Future<Output = Result<Outcome>> + Send + 'static,
    {
        // Held across launch so a fast request cannot settle before its
        // entry exists.
        let mut entries = lock(&self.entries);
        if let Some(existing) = entries.get(&key) {
            tracing::trace!("joining in-flight request for {}", key);
            return existing.clone();
        }

        let registry = Arc::downgrade(&self.entries);
        let settled_key = key.clone();
        let pending = Pending::launch(
            async move {
                let result = request.await;
                if let Some(registry) = registry.upgrade() {
                    lock(&registry).remove(&settled_key);
                }
                result
            },
            dispatcher,
        );
        entries.insert(key, pending.clone());
        pending
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

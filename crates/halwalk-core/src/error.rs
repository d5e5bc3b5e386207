//! Error types for the halwalk core library
//!
//! Every failure a request chain can end in is a variant of [`Error`]. The
//! type is cheap to clone because a single in-flight request may be awaited
//! by several callers at once (deduplicated GETs, repeated `.on` attachments).

use std::sync::Arc;
use thiserror::Error;

use crate::response::{Reply, Response};

/// Boxed transport-level cause, shared between clones of one error
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Main error type for halwalk operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Network or other non-HTTP failure reported by the transport.
    ///
    /// Never routed to status handlers, not even `xxx`.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// No local or global handler matched the reply's status
    #[error("Unhandled response status: {status}")]
    Unhandled {
        status: String,
        reply: Reply,
    },

    /// At least one request of a follow-all failed.
    ///
    /// `outcomes` holds every per-link result in link order.
    #[error(
        "Follow-all failed: {} of {} requests did not complete",
        .outcomes.iter().filter(|o| o.is_err()).count(),
        .outcomes.len()
    )]
    FollowAll {
        outcomes: Vec<std::result::Result<Response, Error>>,
    },

    /// A verb was called with a target that yields no URL
    #[error("No URL could be resolved from {target}")]
    MissingUrl {
        target: String,
    },

    /// A link or base URL could not be parsed or joined
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        url: String,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
    },

    /// JSON serialization errors for request bodies
    #[error("JSON error: {message}")]
    Json {
        message: String,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a transport error from any error value
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport {
            message: err.to_string(),
            source: Some(Arc::new(err)),
        }
    }

    /// The reply attached to an unhandled-status rejection, if any
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Error::Unhandled { reply, .. } => Some(reply),
            _ => None,
        }
    }

    /// Per-link outcomes of a failed follow-all, if this is one
    pub fn outcomes(&self) -> Option<&[std::result::Result<Response, Error>]> {
        match self {
            Error::FollowAll { outcomes } => Some(outcomes),
            _ => None,
        }
    }

    /// Whether the failure came from the transport rather than dispatch
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::transport(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl {
            url: String::new(),
            message: err.to_string(),
        }
    }
}

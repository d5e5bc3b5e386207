//! HTTP plumbing underneath the client
//!
//! This module provides:
//! - The transport boundary and a reqwest-backed transport
//! - Default header policy per method class
//! - Deduplication of concurrent identical GET requests
//! - Optional serialization of unsafe requests
//! - Client configuration

pub mod config;
pub mod headers;
pub mod transport;

pub(crate) mod cache;
pub(crate) mod sequencer;

pub use config::{ClientConfig, ResponseTransformer};
pub use headers::{compute_headers, HeaderSet, MethodClass};
pub use transport::{FetchOptions, RequestInit, ReqwestTransport, Transport, TransportConfig};

// Re-export commonly used types
pub use reqwest::Method;

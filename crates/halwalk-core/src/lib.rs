//! Halwalk Core - HAL relation following and status-driven response dispatch
//!
//! This crate layers HAL (`application/hal+json`) navigation on top of a
//! pluggable HTTP transport and routes every response to a handler chosen
//! by its status code.
//!
//! # Main Components
//!
//! - **Client**: [`HalClient`] issues GET/HEAD/PUT/POST/PATCH/DELETE,
//!   deduplicates concurrent GETs and can serialize unsafe requests
//! - **Relation Following**: [`HalClient::follow`] resolves a relation from
//!   embedded data or links, expanding URI templates
//! - **Status Dispatch**: [`Pending::on`] picks the most specific handler
//!   (`"404"`, `"40x"`, `"4xx"`, `"xxx"`, `"norel"`) with global fallback
//! - **Error Handling**: a single cloneable [`Error`] built with `thiserror`
//!
//! # Example
//!
//! ```no_run
//! use halwalk_core::{ClientConfig, FollowOptions, HalClient, Handlers, Outcome, RequestOptions};
//!
//! async fn example() -> halwalk_core::Result<()> {
//!     let config = ClientConfig::new().with_base_url("https://api.example.com/")?;
//!     let client = HalClient::new(config)?;
//!
//!     let cars = client
//!         .get("/me", &RequestOptions::new())?
//!         .on(Handlers::new().on("200", client.then_follow("cars", FollowOptions::new())))
//!         .on(Handlers::new().on("2xx", |cars, _| Outcome::Value(cars)))
//!         .value()
//!         .await?;
//!     println!("{:?}", cars);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
pub mod follow;
pub mod hal;
pub mod http;
pub mod pending;
pub mod response;
pub mod template;

// Re-export main types for convenience
pub use client::{HalClient, RequestOptions, Target};
pub use dispatch::{Handlers, IntoReaction, LogSink};
pub use error::{Error, Result};
pub use follow::FollowOptions;
pub use hal::{can_follow, first_relation_href, remove_hal_keys, self_link, Link};
pub use http::{ClientConfig, FetchOptions, Method, RequestInit, ReqwestTransport, Transport, TransportConfig};
pub use pending::{Outcome, Pending};
pub use response::{RawResponse, Reply, RequestContext, Response, ResponseSet, Status};

/// Version of the halwalk core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

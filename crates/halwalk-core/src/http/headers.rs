//! Default header policy for HAL requests
//!
//! Every request starts from a default set chosen by method class and is
//! then overlaid with client-wide and per-call headers.

use std::collections::{BTreeMap, HashMap};
use reqwest::Method;

/// Header map as sent on the wire: lower-cased names, sorted
pub type HeaderSet = BTreeMap<String, String>;

/// Accept header sent with every request
pub const ACCEPT: &str = "application/hal+json, application/json;q=0.8";
/// Content type for PUT/POST/DELETE bodies
pub const JSON: &str = "application/json";
/// Content type for PATCH bodies
pub const JSON_PATCH: &str = "application/json-patch+json";

/// Method classes with distinct default headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// GET and HEAD
    Safe,
    /// PATCH
    Patch,
    /// PUT, POST, DELETE and anything else
    Unsafe,
}

impl MethodClass {
    /// Classify an HTTP method
    pub fn of(method: &Method) -> Self {
        if *method == Method::GET || *method == Method::HEAD {
            MethodClass::Safe
        } else if *method == Method::PATCH {
            MethodClass::Patch
        } else {
            MethodClass::Unsafe
        }
    }

    /// Default headers for this class
    pub fn defaults(self) -> HeaderSet {
        let mut headers = HeaderSet::new();
        headers.insert("accept".to_string(), ACCEPT.to_string());
        match self {
            MethodClass::Safe => {}
            MethodClass::Unsafe => {
                headers.insert("content-type".to_string(), JSON.to_string());
            }
            MethodClass::Patch => {
                headers.insert("content-type".to_string(), JSON_PATCH.to_string());
            }
        }
        headers
    }
}

/// Compute the headers for a request.
///
/// Later sources win: defaults, then `global`, then `local`. Names are
/// lower-cased, values are kept as given.
pub fn compute_headers(
    method: &Method,
    global: &HashMap<String, String>,
    local: &HashMap<String, String>,
) -> HeaderSet {
    let mut headers = MethodClass::of(method).defaults();
    for (name, value) in global.iter().chain(local.iter()) {
        headers.insert(name.to_ascii_lowercase(), value.clone());
    }
    headers
}

/// Deterministic fingerprint of a header set, `key=value` pairs sorted by key
pub fn fingerprint(headers: &HeaderSet) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

//! Pure helpers over HAL representations
//!
//! A representation is any JSON object. The reserved keys `_links` and
//! `_embedded` carry navigation; everything else is domain data. Nothing
//! outside this module and the relation resolver looks at the reserved keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved key holding link objects
pub const LINKS: &str = "_links";
/// Reserved key holding embedded representations
pub const EMBEDDED: &str = "_embedded";

/// A HAL link object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target URL, or a URI Template when `templated` is set
    pub href: String,
    /// Whether `href` needs variable expansion
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
}

impl Link {
    /// Create a plain link
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: false,
        }
    }

    /// Create a templated link
    pub fn templated(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: true,
        }
    }
}

/// Normalize a value that may be a single item or a list into a list
fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Link objects for a relation, in document order.
///
/// Entries without a string `href` are skipped.
pub fn links(representation: &Value, relation: &str) -> Vec<Link> {
    representation
        .get(LINKS)
        .and_then(|links| links.get(relation))
        .map(|value| {
            one_or_many(value)
                .into_iter()
                .filter_map(|link| serde_json::from_value::<Link>(link.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Embedded representations for a relation, in document order
pub fn embedded<'a>(representation: &'a Value, relation: &str) -> Option<Vec<&'a Value>> {
    representation
        .get(EMBEDDED)
        .and_then(|embedded| embedded.get(relation))
        .map(one_or_many)
}

/// Whether `relation` is reachable either as a link or as embedded data
pub fn can_follow(representation: &Value, relation: &str) -> bool {
    let has = |key: &str| {
        representation
            .get(key)
            .and_then(|section| section.get(relation))
            .is_some()
    };
    has(LINKS) || has(EMBEDDED)
}

/// Href of the first link for `relation`.
///
/// Looks in `_links` first, then at the `self` link of the first embedded
/// representation for that relation.
pub fn first_relation_href(representation: &Value, relation: &str) -> Option<String> {
    if let Some(link) = links(representation, relation).into_iter().next() {
        return Some(link.href);
    }

    embedded(representation, relation)
        .and_then(|items| items.into_iter().next())
        .and_then(|item| links(item, "self").into_iter().next())
        .map(|link| link.href)
}

/// Href of the representation's own `self` link
pub fn self_link(representation: &Value) -> Option<String> {
    first_relation_href(representation, "self")
}

/// Deep copy of a representation with `_links` and `_embedded` removed
/// at every level
pub fn remove_hal_keys(representation: &Value) -> Value {
    match representation {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != LINKS && key.as_str() != EMBEDDED)
                .map(|(key, value)| (key.clone(), remove_hal_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(remove_hal_keys).collect()),
        other => other.clone(),
    }
}

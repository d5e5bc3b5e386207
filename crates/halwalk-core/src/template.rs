//! URI Template expansion for templated links
//!
//! Implements the RFC 6570 expression forms HAL APIs use in practice:
//! `{var}`, `{+var}`, `{#var}`, `{.var}`, `{/var}`, `{;var}`, `{?var}` and
//! `{&var}`, with comma-separated variable lists, the explode modifier `*`
//! and the prefix modifier `:n`. Undefined variables are dropped.

use std::collections::HashMap;
use serde_json::Value;

/// Template variables
pub type Vars = HashMap<String, Value>;

/// Characters left as-is by reserved expansion (`+` and `#`)
const RESERVED: &str = ":/?#[]@!$&'()*+,;=";

/// Expansion rules for one operator
struct Operator {
    first: &'static str,
    separator: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

impl Operator {
    fn parse(expression: &str) -> (Self, &str) {
        let (op, rest) = match expression.chars().next() {
            Some(c @ ('+' | '#' | '.' | '/' | ';' | '?' | '&')) => (c, &expression[1..]),
            _ => (' ', expression),
        };
        let operator = match op {
            '+' => Operator { first: "", separator: ",", named: false, if_empty: "", allow_reserved: true },
            '#' => Operator { first: "#", separator: ",", named: false, if_empty: "", allow_reserved: true },
            '.' => Operator { first: ".", separator: ".", named: false, if_empty: "", allow_reserved: false },
            '/' => Operator { first: "/", separator: "/", named: false, if_empty: "", allow_reserved: false },
            ';' => Operator { first: ";", separator: ";", named: true, if_empty: "", allow_reserved: false },
            '?' => Operator { first: "?", separator: "&", named: true, if_empty: "=", allow_reserved: false },
            '&' => Operator { first: "&", separator: "&", named: true, if_empty: "=", allow_reserved: false },
            _ => Operator { first: "", separator: ",", named: false, if_empty: "", allow_reserved: false },
        };
        (operator, rest)
    }

    fn encode(&self, raw: &str) -> String {
        if !self.allow_reserved {
            return urlencoding::encode(raw).into_owned();
        }
        let mut out = String::with_capacity(raw.len());
        let mut buf = [0u8; 4];
        for c in raw.chars() {
            if RESERVED.contains(c) || c == '%' {
                out.push(c);
            } else {
                out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
            }
        }
        out
    }
}

/// One variable reference inside an expression
struct VarSpec<'a> {
    name: &'a str,
    explode: bool,
    prefix: Option<usize>,
}

impl<'a> VarSpec<'a> {
    fn parse(spec: &'a str) -> Self {
        let spec = spec.trim();
        if let Some(name) = spec.strip_suffix('*') {
            return VarSpec { name, explode: true, prefix: None };
        }
        match spec.split_once(':') {
            Some((name, len)) => VarSpec {
                name,
                explode: false,
                prefix: len.parse().ok(),
            },
            None => VarSpec { name: spec, explode: false, prefix: None },
        }
    }
}

/// Render a scalar the way it appears in a URL
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn expand_var(op: &Operator, var: &VarSpec<'_>, value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let items: Vec<String> = items.iter().filter_map(scalar).collect();
            if items.is_empty() {
                return None;
            }
            let encoded: Vec<String> = items.iter().map(|item| op.encode(item)).collect();
            Some(if var.explode && op.named {
                encoded
                    .iter()
                    .map(|item| format!("{}={}", var.name, item))
                    .collect::<Vec<_>>()
                    .join(op.separator)
            } else if var.explode {
                encoded.join(op.separator)
            } else {
                named(op, var.name, &encoded.join(","))
            })
        }
        Value::Object(map) => {
            let pairs: Vec<(String, String)> = map
                .iter()
                .filter_map(|(k, v)| scalar(v).map(|v| (op.encode(k), op.encode(&v))))
                .collect();
            if pairs.is_empty() {
                return None;
            }
            Some(if var.explode {
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(op.separator)
            } else {
                let flat: Vec<String> = pairs.into_iter().flat_map(|(k, v)| [k, v]).collect();
                named(op, var.name, &flat.join(","))
            })
        }
        other => {
            let raw = scalar(other)?;
            let raw = match var.prefix {
                Some(len) => raw.chars().take(len).collect(),
                None => raw,
            };
            Some(named(op, var.name, &op.encode(&raw)))
        }
    }
}

fn named(op: &Operator, name: &str, encoded: &str) -> String {
    if !op.named {
        encoded.to_string()
    } else if encoded.is_empty() {
        format!("{}{}", name, op.if_empty)
    } else {
        format!("{}={}", name, encoded)
    }
}

fn expand_expression(expression: &str, vars: &Vars) -> String {
    let (op, list) = Operator::parse(expression);
    let parts: Vec<String> = list
        .split(',')
        .map(VarSpec::parse)
        .filter_map(|var| {
            let value = vars.get(var.name)?;
            expand_var(&op, &var, value)
        })
        .collect();

    if parts.is_empty() {
        String::new()
    } else {
        format!("{}{}", op.first, parts.join(op.separator))
    }
}

/// Expand a URI Template with the given variables.
///
/// Text outside expressions is copied through. An unterminated `{` is
/// copied literally.
pub fn expand(template: &str, vars: &Vars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&expand_expression(&after[..end], vars));
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

//! URL query string decoding.
//!
//! # Rules
//! - Everything up to and including the first `?` is discarded
//! - Pairs split on `&`, each pair on its first `=`
//! - A bare key (`?flag`) yields boolean `true`
//! - Literal `true`/`false`/`null`/`undefined` become primitives
//! - Repeated keys accumulate into an ordered list
//!
//! Numeric coercion is governed by [`NumericCoercion`]. The default reproduces
//! the historical patterns, which test for a literal `d` instead of a digit
//! class, so numeric-looking values stay strings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::decode_component;

static LITERAL_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?d+$").expect("static pattern"));
static LITERAL_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?d*.d+$").expect("static pattern"));
static DIGIT_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("static pattern"));
static DIGIT_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d*\.\d+$").expect("static pattern"));

/// Decoded query mapping.
pub type QueryMap = BTreeMap<String, QueryValue>;

/// A single decoded query value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    /// Present on the wire as the literal `undefined`; serializes as `null`.
    Undefined,
    List(Vec<QueryValue>),
}

impl QueryValue {
    /// String content, when this is a plain string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn accumulate(&mut self, value: QueryValue) {
        match self {
            // An `undefined` slot counts as unset.
            QueryValue::Undefined => *self = value,
            QueryValue::List(items) => items.push(value),
            _ => {
                let first = std::mem::replace(self, QueryValue::Undefined);
                *self = QueryValue::List(vec![first, value]);
            }
        }
    }
}

/// Which patterns gate numeric coercion of query values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericCoercion {
    /// Historical behavior: `^-?d+$` / `^-?d*.d+$`. Numbers stay strings.
    #[default]
    Literal,
    /// Digit-class patterns: `^-?\d+$` / `^-?\d*\.\d+$`.
    Digits,
}

impl NumericCoercion {
    fn patterns(self) -> (&'static Regex, &'static Regex) {
        match self {
            NumericCoercion::Literal => (&LITERAL_INTEGER, &LITERAL_DECIMAL),
            NumericCoercion::Digits => (&DIGIT_INTEGER, &DIGIT_DECIMAL),
        }
    }
}

/// Parse a raw URL or bare query string.
pub fn parse_query(input: &str, coercion: NumericCoercion) -> QueryMap {
    let mut params = QueryMap::new();
    if input.is_empty() {
        return params;
    }

    let query = match input.find('?') {
        Some(idx) => &input[idx + 1..],
        None => input,
    };

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (raw_key, raw_value) = match pair.find('=') {
            None => (pair, None),
            Some(0) => continue,
            Some(idx) => (&pair[..idx], Some(&pair[idx + 1..])),
        };

        match decode_pair(raw_key, raw_value, coercion) {
            Some((key, value)) => match params.get_mut(&key) {
                Some(existing) => existing.accumulate(value),
                None => {
                    params.insert(key, value);
                }
            },
            None => {
                // Undecodable: keep the raw key and value verbatim.
                let value = match raw_value {
                    Some(v) => QueryValue::Str(v.to_string()),
                    None => QueryValue::Bool(true),
                };
                params.insert(raw_key.to_string(), value);
            }
        }
    }

    params
}

fn decode_pair(
    raw_key: &str,
    raw_value: Option<&str>,
    coercion: NumericCoercion,
) -> Option<(String, QueryValue)> {
    let key = decode_component(raw_key)?;
    let value = match raw_value {
        None => QueryValue::Bool(true),
        Some(raw) => coerce(decode_component(raw)?, coercion),
    };
    Some((key, value))
}

fn coerce(decoded: String, coercion: NumericCoercion) -> QueryValue {
    match decoded.as_str() {
        "true" => return QueryValue::Bool(true),
        "false" => return QueryValue::Bool(false),
        "null" => return QueryValue::Null,
        "undefined" => return QueryValue::Undefined,
        _ => {}
    }

    let (integer, decimal) = coercion.patterns();
    if integer.is_match(&decoded) {
        // Only convert when nothing is lost in the round trip.
        if let Ok(n) = decoded.parse::<i64>() {
            if n.to_string() == decoded {
                return QueryValue::Int(n);
            }
        }
    } else if decimal.is_match(&decoded) {
        if let Ok(f) = decoded.parse::<f64>() {
            if f.is_finite() && f.to_string() == decoded {
                return QueryValue::Float(f);
            }
        }
    }

    QueryValue::Str(decoded)
}

//! Value coercion helpers
//!
//! Dictionary values arrive as text. Numeric attributes have their
//! enumerations, examples and boundaries promoted to numbers: a list becomes
//! floats when any token contains a decimal point, integers otherwise.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Enumeration, example or boundary value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    fn rank(&self) -> u8 {
        match self {
            ScalarValue::Int(_) => 0,
            ScalarValue::Float(_) => 1,
            ScalarValue::Text(_) => 2,
        }
    }

    /// Total order used for sorting value lists
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a.cmp(b),
            (ScalarValue::Float(a), ScalarValue::Float(b)) => a.total_cmp(b),
            (ScalarValue::Text(a), ScalarValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::Int(i) => serde_json::Value::from(*i),
            ScalarValue::Float(f) => serde_json::Value::from(*f),
            ScalarValue::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

/// Whether a primitive type class holds numbers
pub fn is_numeric_primitive(primitive: Option<&str>) -> bool {
    primitive
        .map(|p| p.trim().eq_ignore_ascii_case("numb"))
        .unwrap_or(false)
}

/// Parse one numeric token using the decimal-point rule
pub fn parse_number(token: &str, as_float: bool) -> Option<ScalarValue> {
    let t = token.trim();
    if as_float {
        t.parse::<f64>().ok().map(ScalarValue::Float)
    } else {
        t.parse::<i64>().ok().map(ScalarValue::Int)
    }
}

/// Coerce a token list, dropping tokens that do not parse
pub fn coerce_values(tokens: &[String], numeric: bool) -> Vec<ScalarValue> {
    if !numeric {
        return tokens.iter().cloned().map(ScalarValue::Text).collect();
    }
    let as_float = tokens.iter().any(|t| t.contains('.'));
    tokens
        .iter()
        .filter_map(|t| {
            let v = parse_number(t, as_float);
            if v.is_none() {
                debug!(token = %t, "Dropping malformed numeric token");
            }
            v
        })
        .collect()
}

pub fn sort_values(values: &mut [ScalarValue]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

// =============================================================================
// Boundaries
// =============================================================================

/// Numeric limits resolved from boundary pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Bounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<ScalarValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value_exclusive: Option<ScalarValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<ScalarValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_exclusive: Option<ScalarValue>,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        self.min_value.is_none()
            && self.min_value_exclusive.is_none()
            && self.max_value.is_none()
            && self.max_value_exclusive.is_none()
    }
}

fn is_placeholder(token: &str) -> bool {
    token == "." || token == "?"
}

fn mark(seen: &mut Vec<(String, bool)>, token: &str) {
    if !seen.iter().any(|(t, _)| t == token) {
        seen.push((token.to_string(), false));
    }
}

fn mark_inclusive(seen: &mut [(String, bool)], token: &str) {
    for (t, inclusive) in seen.iter_mut() {
        if t == token {
            *inclusive = true;
        }
    }
}

/// Resolve boundary pairs into inclusive and exclusive limits
///
/// Pairs whose ends are equal only mark that value inclusive; they never
/// introduce a limit on their own.
pub fn resolve_bounds(pairs: &[(String, String)]) -> Bounds {
    let mut mins: Vec<(String, bool)> = Vec::new();
    let mut maxs: Vec<(String, bool)> = Vec::new();

    for (lo, hi) in pairs {
        if lo == hi {
            continue;
        }
        if !is_placeholder(lo) {
            mark(&mut mins, lo);
        }
        if !is_placeholder(hi) {
            mark(&mut maxs, hi);
        }
    }
    for (lo, hi) in pairs {
        if lo == hi {
            mark_inclusive(&mut mins, lo);
            mark_inclusive(&mut maxs, hi);
        }
    }

    let mut bounds = Bounds::default();
    for (token, inclusive) in &mins {
        let Some(v) = parse_number(token, token.contains('.')) else {
            debug!(token = %token, "Skipping malformed lower bound");
            continue;
        };
        if *inclusive {
            bounds.min_value = Some(v);
        } else {
            bounds.min_value_exclusive = Some(v);
        }
    }
    for (token, inclusive) in &maxs {
        let Some(v) = parse_number(token, token.contains('.')) else {
            debug!(token = %token, "Skipping malformed upper bound");
            continue;
        };
        if *inclusive {
            bounds.max_value = Some(v);
        } else {
            bounds.max_value_exclusive = Some(v);
        }
    }
    bounds
}

// =============================================================================
// Text
// =============================================================================

/// Remove common leading whitespace from every line, then trim
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| &l[..l.len() - l.trim_start().len()])
        .fold(None::<&str>, |acc, ws| match acc {
            None => Some(ws),
            Some(prev) => {
                let common = prev
                    .char_indices()
                    .zip(ws.chars())
                    .take_while(|((_, a), b)| a == b)
                    .map(|((i, a), _)| i + a.len_utf8())
                    .last()
                    .unwrap_or(0);
                Some(&prev[..common])
            }
        })
        .unwrap_or("");

    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.strip_prefix(indent).unwrap_or(l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

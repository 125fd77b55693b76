//! Parsed show-command output and nested-value extraction.
//!
//! Device output requested with `| display-json` parses into a
//! [`serde_json::Value`] tree of nested mappings. [`extract`] walks such a
//! tree along a key path and stops at the first non-mapping value it meets,
//! even when path segments remain. This is deliberate: depending on the
//! firmware build, some subtrees collapse to a bare leaf (an empty element
//! renders as `""` or `null` instead of an object), and extraction must
//! tolerate both shapes. Changing this contract changes which output shapes
//! are accepted.

use serde_json::Value;

use crate::error::{CfgError, CfgResult};

/// Parses raw `| display-json` output into a value tree.
///
/// An empty document (the device prints nothing when the requested section
/// has no configuration) parses as `Value::Null`.
pub fn parse_display_json(raw: &str) -> CfgResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|e| CfgError::parse(e.to_string()))
}

/// Walks `tree` along `path`, returning the first non-mapping value found.
///
/// At each step the current mapping is indexed by the next key:
/// - if the key is absent, extraction fails (`None`) and the caller
///   substitutes the attribute's default;
/// - if the value is not itself a mapping, it is returned immediately, even
///   if the path is not exhausted;
/// - if the path ends on a mapping, that mapping is returned.
pub fn extract<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = tree;
    for key in path {
        let next = cur.as_object()?.get(*key)?;
        if !next.is_object() {
            return Some(next);
        }
        cur = next;
    }
    Some(cur)
}

/// Like [`extract`], but renders the found leaf as a canonical string.
///
/// Strings pass through, booleans render as `"true"`/`"false"`, numbers in
/// decimal. Mappings and arrays have no scalar rendering and yield `None`.
pub fn extract_str(tree: &Value, path: &[&str]) -> Option<String> {
    leaf_str(extract(tree, path)?)
}

/// Scalar rendering of a single leaf value.
pub fn leaf_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns true when the mapping at `path` contains `key`.
///
/// Several device options are presence-encoded: the key carries no value
/// and its existence alone means "enabled".
pub fn has_key(tree: &Value, path: &[&str], key: &str) -> bool {
    matches!(
        extract(tree, path),
        Some(Value::Object(map)) if map.contains_key(key)
    )
}

/// Collection-or-singleton normalization.
///
/// When a list element has exactly one entry the device emits a bare object
/// instead of a one-element array. Wraps a lone mapping (or scalar) into a
/// one-element sequence so callers always iterate.
pub fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

//! Typed traversal of untyped JSON payload trees.
//!
//! Webhook payloads arrive as arbitrary, deeply nested, loosely typed JSON.
//! This module provides the safe-navigation primitive the normalizer is built
//! on: walk an ordered key path through a [`serde_json::Value`] tree and
//! interpret the final node as a caller-requested leaf type, without ever
//! panicking on shape mismatches.
//!
//! Two variants are provided:
//! - [`lookup`] — silent; absence is an expected outcome ("try the next
//!   fallback path").
//! - [`lookup_or_err`] — diagnostic; names the exact key and partial path
//!   that failed, for call sites where failure must be explained to an
//!   operator.
//!
//! There are no partial results: either every key resolves and the final
//! type check succeeds, or the whole lookup fails. A default is never
//! substituted silently.

use serde_json::Value;

// ============================================================================
// Error Types
// ============================================================================

/// Diagnostic failure from a path lookup.
///
/// A type mismatch at the leaf is deliberately distinct from a missing path:
/// JSON numeric decoding is untyped, and callers may need to coerce rather
/// than treat the field as absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// An intermediate or final key was absent from its parent object.
    #[error("key {key} not found in {path}")]
    KeyNotFound { key: String, path: String },

    /// A node along the path was not an object and could not be descended
    /// into.
    #[error("{path} is not an object")]
    NotAnObject { path: String },

    /// Every key resolved but the final value was not of the requested type.
    #[error("value at {path} is not of type {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
    },
}

// ============================================================================
// Leaf Types
// ============================================================================

/// A semantic leaf type a lookup can resolve to.
pub trait FromJson: Sized {
    /// Human-readable type name used in [`LookupError::TypeMismatch`].
    const EXPECTED: &'static str;

    /// Interpret a JSON node as this type, or `None` on mismatch.
    fn from_json(value: &Value) -> Option<Self>;
}

impl FromJson for String {
    const EXPECTED: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromJson for f64 {
    const EXPECTED: &'static str = "number";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromJson for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_json(value: &Value) -> Option<Self> {
        // as_i64 rejects values with a fractional part, which keeps the
        // integer/float mismatch observable to callers.
        value.as_i64()
    }
}

impl FromJson for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

// ============================================================================
// Lookup Variants
// ============================================================================

/// Silent lookup: walk `keys` through `root` and interpret the final value
/// as `T`.
///
/// Returns `None` when any key is absent, any intermediate node is not an
/// object, or the final type check fails. Callers that need to know *why*
/// should use [`lookup_or_err`].
pub fn lookup<T: FromJson>(root: &Value, keys: &[&str]) -> Option<T> {
    lookup_or_err(root, keys).ok()
}

/// Diagnostic lookup: like [`lookup`] but reports the first failing segment.
///
/// The error names the missing key and the partial path consumed up to that
/// point, so operators can locate payload drift without dumping the payload.
pub fn lookup_or_err<T: FromJson>(root: &Value, keys: &[&str]) -> Result<T, LookupError> {
    let mut current = root;

    for (depth, key) in keys.iter().enumerate() {
        let object = current.as_object().ok_or_else(|| LookupError::NotAnObject {
            path: partial_path(keys, depth),
        })?;

        current = object.get(*key).ok_or_else(|| LookupError::KeyNotFound {
            key: (*key).to_string(),
            path: partial_path(keys, depth),
        })?;
    }

    T::from_json(current).ok_or_else(|| LookupError::TypeMismatch {
        path: partial_path(keys, keys.len()),
        expected: T::EXPECTED,
    })
}

/// The dotted path of the keys consumed before a failure at `depth`.
fn partial_path(keys: &[&str], depth: usize) -> String {
    if depth == 0 {
        "payload root".to_string()
    } else {
        keys[..depth].join(".")
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;

//! Key Normalizer Module
//!
//! Derives namespaced storage keys and applies whitelist filtering.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::Value;
use urlencoding::encode;

/// Query parameters passed to a fetcher; also part of the storage key.
///
/// A `BTreeMap` keeps names sorted, so equal parameter sets always produce
/// the same key regardless of how they were built.
pub type SyncParams = BTreeMap<String, Value>;

// == Key Normalizer ==
/// Builds full keys of the form `prefix + key[?k1=v1&k2=v2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNormalizer {
    prefix: String,
}

impl KeyNormalizer {
    /// Creates a normalizer for the given namespace prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    // == Full Key ==
    /// Derives the full storage key for a logical key and its parameters.
    ///
    /// A key that already carries the prefix is not prefixed again.
    pub fn full_key(&self, key: &str, params: &SyncParams) -> String {
        let logical = self.logical_key(key);

        if params.is_empty() {
            format!("{}{}", self.prefix, logical)
        } else {
            format!("{}{}?{}", self.prefix, logical, query_string(params))
        }
    }

    // == Logical Key ==
    /// Strips the namespace prefix, if present.
    pub fn logical_key<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return key;
        }
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}

/// Serializes parameters as `k1=v1&k2=v2` in name order.
///
/// Names and values are percent-encoded, so distinct parameter sets never
/// share a query string. Strings are written bare; every other value uses
/// its JSON text.
pub fn query_string(params: &SyncParams) -> String {
    params
        .iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => Cow::Borrowed(s.as_str()),
                other => Cow::Owned(other.to_string()),
            };
            format!("{}={}", encode(name), encode(&text))
        })
        .collect::<Vec<_>>()
        .join("&")
}

// == Whitelist ==
/// Substrings that protect keys from Clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    patterns: Vec<String>,
}

impl Whitelist {
    /// Creates a whitelist from substrings.
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Merges a per-call whitelist with this one.
    pub fn merged(&self, extra: &[String]) -> Self {
        let patterns = extra.iter().chain(self.patterns.iter()).cloned().collect();
        Self { patterns }
    }

    /// Returns true if `key` contains any whitelisted substring.
    pub fn protects(&self, key: &str) -> bool {
        self.patterns.iter().any(|p| key.contains(p.as_str()))
    }

    /// Keeps only the keys the whitelist does not protect.
    pub fn unprotected(&self, keys: Vec<String>) -> Vec<String> {
        keys.into_iter().filter(|k| !self.protects(k)).collect()
    }
}

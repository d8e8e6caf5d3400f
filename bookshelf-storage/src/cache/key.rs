//! Request fingerprints and the cache keys derived from them.
//!
//! The read path stores under, and the write path deletes, the key derived
//! for `GET` on the same path. Both must go through the same
//! [`CacheKeyDeriver`] so the prefix and normalization match bit for bit.
//!
//! # Key Format
//!
//! ```text
//! {prefix}:{METHOD}:{normalized_path}[:{vary_digest}]
//! ```
//!
//! The path is kept verbatim (after normalization) rather than hashed, so
//! two different paths can never share a key. The vary digest is a SHA-256
//! over the declared vary headers and is omitted when none are declared.

use std::fmt;

use sha2::{Digest, Sha256};

/// Default namespace for response cache keys.
pub const DEFAULT_KEY_PREFIX: &str = "bookshelf";

/// `(method, normalized path)` of a request. Query strings never take part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint {
    method: String,
    path: String,
}

impl RequestFingerprint {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: normalize_path(path),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Normalize a request path for fingerprinting.
///
/// Drops any query or fragment, collapses repeated slashes and strips a
/// trailing slash (the root path stays `/`).
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Values of the declared vary headers for one request, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaryContext {
    values: Vec<(String, Option<String>)>,
}

impl VaryContext {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, value) in &self.values {
            hasher.update(name.as_bytes());
            match value {
                Some(value) => {
                    hasher.update(b"=");
                    hasher.update(value.as_bytes());
                }
                None => hasher.update(b"!"),
            }
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// A derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pure, deterministic cache key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyDeriver {
    prefix: String,
    vary_headers: Vec<String>,
}

impl CacheKeyDeriver {
    /// Create a deriver for the given namespace prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vary_headers: Vec::new(),
        }
    }

    /// Declare request headers whose values split the cache.
    ///
    /// Names are matched case-insensitively.
    pub fn with_vary_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.vary_headers = headers
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn vary_headers(&self) -> &[String] {
        &self.vary_headers
    }

    /// Collect the vary context of a request through a header lookup.
    pub fn vary_context<F>(&self, mut lookup: F) -> VaryContext
    where
        F: FnMut(&str) -> Option<String>,
    {
        VaryContext {
            values: self
                .vary_headers
                .iter()
                .map(|name| (name.clone(), lookup(name)))
                .collect(),
        }
    }

    /// Derive the key for a fingerprint and vary context.
    pub fn derive_fingerprint(
        &self,
        fingerprint: &RequestFingerprint,
        vary: &VaryContext,
    ) -> CacheKey {
        let mut key = format!(
            "{}:{}:{}",
            self.prefix,
            fingerprint.method(),
            fingerprint.path()
        );
        if !vary.is_empty() {
            key.push(':');
            key.push_str(&vary.digest());
        }
        CacheKey(key)
    }

    /// Derive the key for a method and raw request path.
    pub fn derive(&self, method: &str, path: &str, vary: &VaryContext) -> CacheKey {
        self.derive_fingerprint(&RequestFingerprint::new(method, path), vary)
    }
}

impl Default for CacheKeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

//! Name normalization shared by every identity decision
//!
//! A [`NameKey`] trims surrounding whitespace and collapses internal runs of
//! whitespace to a single space. Case is preserved: "HMS Foo" and "HMS FOO"
//! are different keys. Case-insensitive comparison goes through [`fold`] and is
//! only used for ranking suggestions and for the deterministic fallback match.

use serde::Serialize;
use std::fmt;

/// A normalized entity name, never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NameKey(String);

impl NameKey {
    /// Normalize a raw name; returns `None` for empty or whitespace-only input
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded form of this key
    pub fn folded(&self) -> String {
        self.0.to_lowercase()
    }

    /// True if the two keys differ only in case
    pub fn eq_folded(&self, other: &str) -> bool {
        self.folded() == fold(other)
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NameKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize whitespace and lower-case a name for case-insensitive comparison
pub fn fold(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_trims_and_collapses_whitespace() {
        let key = NameKey::new("  HMS   Foo \t").unwrap();
        assert_eq!(key.as_str(), "HMS Foo");
    }

    #[test]
    fn test_key_preserves_case() {
        assert_ne!(NameKey::new("HMS Foo"), NameKey::new("HMS FOO"));
        assert!(NameKey::new("HMS Foo").unwrap().eq_folded("hms  foo"));
    }

    #[test]
    fn test_empty_names_have_no_key() {
        assert!(NameKey::new("").is_none());
        assert!(NameKey::new("   ").is_none());
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold(" GPS-1  Mk II "), "gps-1 mk ii");
    }
}

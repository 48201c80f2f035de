//! Section Keys
//!
//! `SectionKey` names a navigation section; `SectionCatalog` pairs a key with
//! the calls declared for it.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::call::CallHandler;

/// Name of the default, top-level section
pub const ROOT_KEY: &str = "root";

/// Name of the "pop current section" sentinel
pub const BACK_KEY: &str = "general_back";

/// Immutable section identifier. Equality is by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey(String);

impl SectionKey {
    /// An empty name resolves to `root`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self::root()
        } else {
            Self(name)
        }
    }

    pub fn root() -> Self {
        Self(ROOT_KEY.to_string())
    }

    pub fn back() -> Self {
        Self(BACK_KEY.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_KEY
    }

    pub fn is_back(&self) -> bool {
        self.0 == BACK_KEY
    }
}

impl Default for SectionKey {
    fn default() -> Self {
        Self::root()
    }
}

impl From<&str> for SectionKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY:{}", self.0)
    }
}

/// A section together with its ordered call list.
///
/// Identity is the key alone: re-declaring a section with another call list
/// replaces its membership without changing which section it is.
#[derive(Debug, Clone)]
pub struct SectionCatalog {
    pub key: SectionKey,
    pub calls: Vec<CallHandler>,
}

impl SectionCatalog {
    pub fn new(key: impl Into<SectionKey>, calls: Vec<CallHandler>) -> Self {
        Self {
            key: key.into(),
            calls,
        }
    }
}

impl PartialEq for SectionCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for SectionCatalog {}

impl Hash for SectionCatalog {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for SectionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY:{}({})", self.key.name(), self.calls.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::CallInfo;

    #[test]
    fn test_empty_key_is_root() {
        assert!(SectionKey::new("").is_root());
        assert_eq!(SectionKey::default(), SectionKey::root());
        assert!(SectionKey::back().is_back());
        assert!(!SectionKey::new("basic").is_back());
    }

    #[test]
    fn test_catalog_identity_ignores_calls() {
        let a = SectionCatalog::new("basic", vec![CallInfo::new("a", "first").into_descriptor()]);
        let b = SectionCatalog::new("basic", Vec::new());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "KEY:basic(1)");
        assert_eq!(SectionKey::new("basic").to_string(), "KEY:basic");
    }
}

//! Navigation Chains
//!
//! An ordered list of section keys: either a stack read bottom-to-top, or a
//! batch of pending navigation steps.

use std::fmt;

use super::key::SectionKey;

#[derive(Debug, Clone, Default)]
pub struct NavChain {
    pub keys: Vec<SectionKey>,
}

impl NavChain {
    pub fn new(keys: Vec<SectionKey>) -> Self {
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionKey> {
        self.keys.iter()
    }
}

impl From<Vec<SectionKey>> for NavChain {
    fn from(keys: Vec<SectionKey>) -> Self {
        Self::new(keys)
    }
}

// Chains compare by their rendered path.
impl PartialEq for NavChain {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for NavChain {}

impl fmt::Display for NavChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<&str> = self.keys.iter().map(SectionKey::name).collect();
        write!(f, "->{}", path.join(":"))
    }
}

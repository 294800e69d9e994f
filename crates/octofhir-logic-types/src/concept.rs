//! Coded category references

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A reference to a coded category (a dictionary concept)
///
/// Identity is the numeric id; the name is the human-facing label used when
/// resolving bare tokens against a source's dictionary. Two concepts with the
/// same id compare equal even if their display names differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    id: u64,
    name: String,
}

impl Concept {
    /// Create a new concept reference
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The concept's numeric identity
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The concept's display name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Concept {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Concept {}

impl Hash for Concept {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_id() {
        let a = Concept::new(7, "CD4 COUNT");
        let b = Concept::new(7, "CD4, BY FACS");
        let c = Concept::new(8, "CD4 COUNT");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

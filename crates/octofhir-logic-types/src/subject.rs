//! Subject identifiers and cohorts

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one subject record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a subject identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of unique subject identifiers
///
/// Evaluation always proceeds over the full cohort even when only one
/// subject's answer is requested; iteration order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cohort {
    members: IndexSet<SubjectId>,
}

impl Cohort {
    /// Create an empty cohort
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cohort containing a single subject
    pub fn single(subject: impl Into<SubjectId>) -> Self {
        let mut cohort = Self::new();
        cohort.insert(subject);
        cohort
    }

    /// Add a subject; duplicates are ignored, insertion order is kept
    pub fn insert(&mut self, subject: impl Into<SubjectId>) -> bool {
        self.members.insert(subject.into())
    }

    /// Whether the cohort contains the subject
    pub fn contains(&self, subject: &SubjectId) -> bool {
        self.members.contains(subject)
    }

    /// Number of subjects
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cohort is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate subjects in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SubjectId> {
        self.members.iter()
    }

    /// Membership sorted lexicographically, for cache-key construction
    pub fn sorted(&self) -> Vec<SubjectId> {
        let mut members: Vec<SubjectId> = self.members.iter().cloned().collect();
        members.sort();
        members
    }
}

impl<S: Into<SubjectId>> FromIterator<S> for Cohort {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut cohort = Self::new();
        for subject in iter {
            cohort.insert(subject);
        }
        cohort
    }
}

impl<'a> IntoIterator for &'a Cohort {
    type Item = &'a SubjectId;
    type IntoIter = indexmap::set::Iter<'a, SubjectId>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohort_preserves_insertion_order_and_uniqueness() {
        let cohort: Cohort = ["P2", "P1", "P2", "P3"].into_iter().collect();
        let order: Vec<&str> = cohort.iter().map(SubjectId::as_str).collect();
        assert_eq!(order, vec!["P2", "P1", "P3"]);
    }

    #[test]
    fn test_sorted_is_stable_across_insertion_orders() {
        let a: Cohort = ["P2", "P1"].into_iter().collect();
        let b: Cohort = ["P1", "P2"].into_iter().collect();
        assert_eq!(a.sorted(), b.sorted());
    }
}

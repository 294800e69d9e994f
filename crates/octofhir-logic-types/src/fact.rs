//! Dated facts and ordered fact collections

use crate::value::DataValue;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::fmt;

/// Where a fact came from: the producing entity (a data source key or a
/// rule token) and the record identifier within that entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    entity: String,
    record: u64,
}

impl Provenance {
    /// Create provenance for the given entity and record id
    pub fn new(entity: impl Into<String>, record: u64) -> Self {
        Self {
            entity: entity.into(),
            record,
        }
    }

    /// Producing entity name
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Record identifier within the entity
    pub const fn record(&self) -> u64 {
        self.record
    }
}

/// A single dated datum for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    value: DataValue,
    effective: DateTime<Utc>,
    provenance: Provenance,
}

impl Fact {
    /// Create a fact with anonymous provenance
    pub fn new(value: impl Into<DataValue>, effective: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            effective,
            provenance: Provenance::new("", 0),
        }
    }

    /// Attach provenance to this fact
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// The typed payload
    pub const fn value(&self) -> &DataValue {
        &self.value
    }

    /// When the datum became effective
    pub const fn effective(&self) -> DateTime<Utc> {
        self.effective
    }

    /// Origin of the datum
    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Total order used everywhere facts are sorted: effective date first,
    /// then record id as the deterministic tie break.
    fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.effective, self.provenance.record)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.value, self.effective.to_rfc3339())
    }
}

/// An ordered collection of facts for one subject.
///
/// Most evaluations yield zero or one fact, so the backing storage is
/// inline for the single-fact case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facts(SmallVec<[Fact; 1]>);

impl Facts {
    /// The empty collection
    pub const fn empty() -> Self {
        Self(SmallVec::new_const())
    }

    /// A collection holding a single fact
    pub fn single(fact: Fact) -> Self {
        let mut facts = SmallVec::new_const();
        facts.push(fact);
        Self(facts)
    }

    /// Append a fact, preserving insertion order
    pub fn push(&mut self, fact: Fact) {
        self.0.push(fact);
    }

    /// Number of facts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection holds no facts
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in current order
    pub fn iter(&self) -> std::slice::Iter<'_, Fact> {
        self.0.iter()
    }

    /// First fact in current order
    pub fn first(&self) -> Option<&Fact> {
        self.0.first()
    }

    /// Last fact in current order
    pub fn last(&self) -> Option<&Fact> {
        self.0.last()
    }

    /// The fact with the greatest (effective, record) key
    pub fn latest(&self) -> Option<&Fact> {
        self.0.iter().max_by_key(|f| f.order_key())
    }

    /// The fact with the least (effective, record) key
    pub fn earliest(&self) -> Option<&Fact> {
        self.0.iter().min_by_key(|f| f.order_key())
    }

    /// Sort oldest first; ties keep insertion order
    pub fn sort_ascending(&mut self) {
        self.0.sort_by_key(Fact::order_key);
    }

    /// Sort newest first; ties keep insertion order
    pub fn sort_descending(&mut self) {
        self.0.sort_by_key(|f| Reverse(f.order_key()));
    }

    /// Keep at most the first `n` facts in current order
    pub fn truncate(&mut self, n: usize) {
        self.0.truncate(n);
    }

    /// Drop duplicate facts, keeping the first occurrence of each
    pub fn dedup_all(&mut self) {
        let mut seen: Vec<Fact> = Vec::with_capacity(self.0.len());
        self.0.retain(|f| {
            if seen.contains(f) {
                false
            } else {
                seen.push(f.clone());
                true
            }
        });
    }

    /// Coerce to a boolean: empty is false, otherwise every fact must
    /// be truthy.
    pub fn to_boolean(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|f| f.value.is_truthy())
    }

    /// Numeric payload of the latest fact, if any
    pub fn to_numeric(&self) -> Option<Decimal> {
        self.latest().and_then(|f| f.value.as_numeric())
    }

    /// Date/time payload of the latest fact, if any
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        self.latest().and_then(|f| f.value.as_datetime())
    }

    /// Text payload of the latest fact, if any
    pub fn to_text(&self) -> Option<&str> {
        self.latest().and_then(|f| f.value.as_text())
    }
}

impl FromIterator<Fact> for Facts {
    fn from_iter<I: IntoIterator<Item = Fact>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Facts {
    type Item = Fact;
    type IntoIter = smallvec::IntoIter<[Fact; 1]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Facts {
    type Item = &'a Fact;
    type IntoIter = std::slice::Iter<'a, Fact>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Extend<Fact> for Facts {
    fn extend<I: IntoIterator<Item = Fact>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

//! In-memory fact sources
//!
//! Reference backends holding rows per subject and interpreting translated
//! predicates directly. They serve tests, demos and small deployments; a
//! persistent backend would compile the same predicates into its own query
//! language instead of interpreting them row by row.

mod encounter;
mod observation;
mod person;

pub use encounter::MemoryEncounterSource;
pub use observation::MemoryObservationSource;
pub use person::MemoryPersonSource;

use crate::criterion::{Criterion, FieldRef};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use octofhir_logic_types::{Concept, DataValue, Fact, Provenance};
use std::cmp::Ordering;

/// One stored fact row
#[derive(Debug, Clone)]
pub struct RecordRow {
    /// Record identifier; doubles as creation order for tie-breaks
    pub record: u64,
    /// Token this row answers
    pub token: String,
    /// Coded category, when the source categorizes rows
    pub category: Option<Concept>,
    /// Value payload
    pub value: DataValue,
    /// When the fact became effective
    pub effective: DateTime<Utc>,
    /// Structural attributes such as location or provider
    pub attributes: IndexMap<String, DataValue>,
}

impl RecordRow {
    /// Whether this row satisfies a translated predicate
    pub fn matches(&self, criterion: &Criterion) -> bool {
        match criterion {
            Criterion::And(l, r) => self.matches(l) && self.matches(r),
            Criterion::Or(l, r) => self.matches(l) || self.matches(r),
            Criterion::Not(c) => !self.matches(c),
            Criterion::Compare { field, op, value } => self
                .field(field)
                .and_then(|actual| compare_values(&actual, value))
                .is_some_and(|ordering| op.accepts(ordering)),
            Criterion::Between { field, low, high } => match self.field(field) {
                Some(DataValue::Datetime(d)) => *low <= d && d <= *high,
                _ => false,
            },
            Criterion::Contains { field, value } => self
                .field(field)
                .is_some_and(|actual| contains_value(&actual, value)),
            Criterion::In { field, values } => self
                .field(field)
                .is_some_and(|actual| values.contains(&actual)),
        }
    }

    /// Turn this row into a fact carrying `value` as the payload
    pub fn fact_with(&self, value: DataValue) -> Fact {
        Fact::new(value, self.effective)
            .with_provenance(Provenance::new(self.token.clone(), self.record))
    }

    fn field(&self, field: &FieldRef) -> Option<DataValue> {
        match field {
            FieldRef::Effective => Some(DataValue::Datetime(self.effective)),
            FieldRef::Category => self.category.clone().map(DataValue::Coded),
            FieldRef::Value => Some(self.value.clone()),
            FieldRef::Attribute(name) => self.attributes.get(name).cloned(),
        }
    }
}

fn compare_values(actual: &DataValue, expected: &DataValue) -> Option<Ordering> {
    match (actual, expected) {
        (DataValue::Numeric(a), DataValue::Numeric(b)) => Some(a.cmp(b)),
        (DataValue::Datetime(a), DataValue::Datetime(b)) => Some(a.cmp(b)),
        (DataValue::Text(a), DataValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (DataValue::Boolean(a), DataValue::Boolean(b)) => Some(a.cmp(b)),
        // coded values have no order; only equality is meaningful
        (DataValue::Coded(a), DataValue::Coded(b)) => (a == b).then_some(Ordering::Equal),
        _ => None,
    }
}

fn contains_value(actual: &DataValue, expected: &DataValue) -> bool {
    match (actual, expected) {
        (DataValue::Text(a), DataValue::Text(b)) => a.contains(b.as_str()),
        (DataValue::Coded(a), DataValue::Coded(b)) => a == b,
        (DataValue::Numeric(a), DataValue::Numeric(b)) => a == b,
        _ => false,
    }
}

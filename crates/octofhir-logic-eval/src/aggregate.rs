//! Post-fetch transforms applied to per-subject result lists.
//!
//! A transform runs after the data source (or rule batch) has produced its
//! raw results and before anything is cached, so cached entries already hold
//! the aggregated shape. Every subject of the active cohort is visited, which
//! is what gives COUNT its zero for subjects with no matching facts and
//! EXISTS its explicit `false`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use octofhir_logic_ast::{Operator, Transform};
use octofhir_logic_diagnostics::{LogicError, LogicResult};
use octofhir_logic_types::{Cohort, DataValue, Fact, Facts, Provenance, ResultMap};
use rust_decimal::Decimal;

/// Sort component selecting the fact payload instead of the fact date.
const SORT_BY_VALUE: &str = "value";
/// Sort component naming the default date ordering explicitly.
const SORT_BY_DATE: &str = "date";

/// Applies `transform` to the fetched results of a whole cohort.
///
/// With no transform the fetched map passes through untouched. Otherwise the
/// cohort is walked in order and each subject's list (empty when absent from
/// the fetch) is reduced independently. Subjects whose reduced list is empty
/// are left out of the returned map.
pub fn apply(
    transform: Option<&Transform>,
    fetched: ResultMap,
    cohort: &Cohort,
    index_date: DateTime<Utc>,
    entity: &str,
) -> LogicResult<ResultMap> {
    let Some(transform) = transform else {
        return Ok(fetched);
    };
    let mut aggregated = ResultMap::new();
    for subject in cohort.iter() {
        let facts = fetched.get(subject).cloned().unwrap_or_else(Facts::empty);
        let reduced = apply_one(transform, facts, index_date, entity)?;
        if !reduced.is_empty() {
            aggregated.insert(subject.clone(), reduced);
        }
    }
    Ok(aggregated)
}

/// Reduces a single subject's fact list.
fn apply_one(
    transform: &Transform,
    mut facts: Facts,
    index_date: DateTime<Utc>,
    entity: &str,
) -> LogicResult<Facts> {
    match transform.op {
        Operator::Count => {
            let count = DataValue::Numeric(Decimal::from(facts.len()));
            Ok(Facts::single(stamped(count, index_date, entity)))
        }
        Operator::Average => average(&facts, index_date, entity),
        Operator::First => {
            sort(&mut facts, transform, SortDirection::Ascending)?;
            facts.truncate(transform.count.unwrap_or(1));
            Ok(facts)
        }
        Operator::Last => {
            sort(&mut facts, transform, SortDirection::Descending)?;
            facts.truncate(transform.count.unwrap_or(1));
            Ok(facts)
        }
        Operator::Distinct => {
            facts.dedup_all();
            Ok(facts)
        }
        Operator::Exists => {
            let present = DataValue::Boolean(!facts.is_empty());
            Ok(Facts::single(stamped(present, index_date, entity)))
        }
        Operator::NotExists => {
            let absent = DataValue::Boolean(facts.is_empty());
            Ok(Facts::single(stamped(absent, index_date, entity)))
        }
        other => Err(LogicError::malformed(format!(
            "operator '{other}' cannot be applied as a result transform"
        ))),
    }
}

/// Mean of the numeric facts, or an empty list when none are numeric.
fn average(facts: &Facts, index_date: DateTime<Utc>, entity: &str) -> LogicResult<Facts> {
    let numerics: Vec<Decimal> = facts
        .iter()
        .filter_map(|fact| fact.value().as_numeric())
        .collect();
    if numerics.is_empty() {
        return Ok(Facts::empty());
    }
    let sum: Decimal = numerics.iter().copied().sum();
    match sum.checked_div(Decimal::from(numerics.len())) {
        Some(mean) => Ok(Facts::single(stamped(
            DataValue::Numeric(mean),
            index_date,
            entity,
        ))),
        None => Ok(Facts::empty()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortDirection {
    Ascending,
    Descending,
}

/// Orders facts by the transform's sort component before truncation.
fn sort(facts: &mut Facts, transform: &Transform, direction: SortDirection) -> LogicResult<()> {
    match transform.sort_by.as_deref() {
        None | Some(SORT_BY_DATE) => match direction {
            SortDirection::Ascending => facts.sort_ascending(),
            SortDirection::Descending => facts.sort_descending(),
        },
        Some(SORT_BY_VALUE) => sort_by_value(facts, direction),
        Some(other) => {
            return Err(LogicError::malformed(format!(
                "unknown sort component '{other}'"
            )));
        }
    }
    Ok(())
}

/// Payload ordering with the date ordering as tie-break.
fn sort_by_value(facts: &mut Facts, direction: SortDirection) {
    let mut sorted: Vec<Fact> = std::mem::take(facts).into_iter().collect();
    sorted.sort_by(|a, b| {
        let by_value = value_ordering(a.value(), b.value());
        let by_value = match direction {
            SortDirection::Ascending => by_value,
            SortDirection::Descending => by_value.reverse(),
        };
        by_value.then_with(|| {
            let dates = (a.effective(), a.provenance().record())
                .cmp(&(b.effective(), b.provenance().record()));
            match direction {
                SortDirection::Ascending => dates,
                SortDirection::Descending => dates.reverse(),
            }
        })
    });
    *facts = sorted.into_iter().collect();
}

/// Total order over payloads. Values of different datatypes group by type.
fn value_ordering(a: &DataValue, b: &DataValue) -> Ordering {
    match (a, b) {
        (DataValue::Boolean(x), DataValue::Boolean(y)) => x.cmp(y),
        (DataValue::Numeric(x), DataValue::Numeric(y)) => x.cmp(y),
        (DataValue::Datetime(x), DataValue::Datetime(y)) => x.cmp(y),
        (DataValue::Text(x), DataValue::Text(y)) => x.cmp(y),
        (DataValue::Coded(x), DataValue::Coded(y)) => x.name().cmp(y.name()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(value: &DataValue) -> u8 {
    match value {
        DataValue::Boolean(_) => 0,
        DataValue::Numeric(_) => 1,
        DataValue::Datetime(_) => 2,
        DataValue::Text(_) => 3,
        DataValue::Coded(_) => 4,
    }
}

/// An aggregate fact dated at the index date and attributed to the entity
/// the criteria asked about. Record id zero marks a derived fact.
fn stamped(value: DataValue, index_date: DateTime<Utc>, entity: &str) -> Fact {
    Fact::new(value, index_date).with_provenance(Provenance::new(entity, 0))
}

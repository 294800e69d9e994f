//! Composite keys for cached evaluation results.

use chrono::{DateTime, NaiveDate, Utc};
use octofhir_logic_ast::{Criteria, Operand, Parameters};
use octofhir_logic_types::{Cohort, SubjectId};
use serde::{Deserialize, Serialize};

/// Identity of one cached cohort batch.
///
/// The index date is coarsened to its calendar day so that repeated
/// evaluations within the same day share an entry. Criteria that pin an
/// explicit reference date carry it inside their expression, so two requests
/// about different reference points never collapse into one key even when
/// issued on the same day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    criteria: Criteria,
    /// Merged parameters, ordered by name for a stable identity.
    parameters: Vec<(String, Operand)>,
    /// Name of the data source consulted, absent for rule-level entries.
    source: Option<String>,
    day_bucket: NaiveDate,
    /// Sorted cohort membership.
    cohort: Vec<SubjectId>,
}

impl CacheKey {
    /// Key for a rule evaluated over `cohort`.
    pub fn for_rule(
        criteria: &Criteria,
        parameters: Option<&Parameters>,
        index_date: DateTime<Utc>,
        cohort: &Cohort,
    ) -> Self {
        Self::build(criteria, parameters, None, index_date, cohort)
    }

    /// Key for a direct data source read over `cohort`.
    pub fn for_source(
        criteria: &Criteria,
        parameters: Option<&Parameters>,
        source: &str,
        index_date: DateTime<Utc>,
        cohort: &Cohort,
    ) -> Self {
        Self::build(criteria, parameters, Some(source.to_string()), index_date, cohort)
    }

    fn build(
        criteria: &Criteria,
        parameters: Option<&Parameters>,
        source: Option<String>,
        index_date: DateTime<Utc>,
        cohort: &Cohort,
    ) -> Self {
        let mut parameters: Vec<(String, Operand)> = parameters
            .map(|map| {
                map.iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        parameters.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            criteria: criteria.clone(),
            parameters,
            source,
            day_bucket: index_date.date_naive(),
            cohort: cohort.sorted(),
        }
    }

    /// Calendar day the entry belongs to.
    pub const fn day_bucket(&self) -> NaiveDate {
        self.day_bucket
    }

    /// Source component of the key, when present.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

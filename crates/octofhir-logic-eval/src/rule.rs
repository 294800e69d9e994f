//! Pluggable rule implementations.

use chrono::{DateTime, Datelike, Utc};
use octofhir_logic_ast::{Criteria, Parameters};
use octofhir_logic_diagnostics::LogicResult;
use octofhir_logic_types::{DataValue, Fact, Facts, Provenance, SubjectId};
use rust_decimal::Decimal;

use crate::context::LogicContext;

/// A named unit of clinical logic.
///
/// Rules are registered under tokens and evaluated through a
/// [`LogicContext`], which batches the whole cohort, applies any result
/// transform and caches the outcome. A rule only answers for one subject.
pub trait Rule: Send + Sync {
    /// Produces the subject's results as of the context's index date.
    fn eval(
        &self,
        context: &LogicContext<'_>,
        subject: &SubjectId,
        parameters: &Parameters,
    ) -> LogicResult<Facts>;

    /// Seconds an evaluated batch stays fresh. Zero disables caching.
    fn ttl(&self) -> u64 {
        0
    }

    /// Name of the data source this rule merely aliases, if any.
    ///
    /// The context forwards criteria for aliasing rules straight to the
    /// source so that filters and transforms reach the fetch and results
    /// are cached once, under the source entry.
    fn reference(&self) -> Option<&str> {
        None
    }
}

/// Rule that aliases one key of a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRule {
    source: String,
    key: String,
}

impl ReferenceRule {
    pub fn new(source: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            key: key.into(),
        }
    }

    /// Source the rule reads from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Key the rule asks the source about.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Rule for ReferenceRule {
    fn eval(
        &self,
        context: &LogicContext<'_>,
        subject: &SubjectId,
        _parameters: &Parameters,
    ) -> LogicResult<Facts> {
        context.read(subject, &self.source, &Criteria::token(self.key.as_str()))
    }

    fn reference(&self) -> Option<&str> {
        Some(&self.source)
    }
}

/// Whole years lived at the index date, derived from the person source.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgeRule;

/// Token the age rule reads from the person source.
const BIRTHDATE_KEY: &str = "BIRTHDATE";

impl Rule for AgeRule {
    fn eval(
        &self,
        context: &LogicContext<'_>,
        subject: &SubjectId,
        _parameters: &Parameters,
    ) -> LogicResult<Facts> {
        let birth = context.read(subject, "person", &Criteria::token(BIRTHDATE_KEY))?;
        let Some(birthdate) = birth.to_datetime() else {
            return Ok(Facts::empty());
        };
        let years = full_years_between(birthdate, context.index_date());
        let age = Fact::new(DataValue::Numeric(Decimal::from(years)), context.index_date())
            .with_provenance(Provenance::new("AGE", 0));
        Ok(Facts::single(age))
    }

    fn ttl(&self) -> u64 {
        60 * 60 * 24
    }
}

/// Calendar years completed between two instants.
fn full_years_between(birth: DateTime<Utc>, reference: DateTime<Utc>) -> i64 {
    let mut years = i64::from(reference.year()) - i64::from(birth.year());
    if (reference.month(), reference.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

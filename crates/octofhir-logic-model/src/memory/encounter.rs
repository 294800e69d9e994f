//! In-memory encounter source

use super::RecordRow;
use crate::source::{DataSource, ReadRequest};
use crate::translate::{FieldMap, FieldTarget, Translator};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::debug;
use octofhir_logic_ast::Operator;
use octofhir_logic_diagnostics::{LogicError, LogicResult};
use octofhir_logic_types::{DataValue, Facts, ResultMap, SubjectId};
use once_cell::sync::Lazy;

/// Seconds a fetched encounter batch stays fresh
const DEFAULT_TTL: u64 = 60 * 60;

static FIELDS: Lazy<IndexMap<&'static str, FieldTarget>> = Lazy::new(|| {
    IndexMap::from([
        ("ENCOUNTER", FieldTarget::Primary),
        ("LOCATION", FieldTarget::Attribute("location".to_string())),
        ("PROVIDER", FieldTarget::Attribute("provider".to_string())),
    ])
});

/// Encounter rows with location and provider attributes.
///
/// Location and provider are encounter-level fields; they resolve only
/// here, and only for equality-style comparisons. Ordering comparisons
/// against them are rejected at translation time.
#[derive(Default)]
pub struct MemoryEncounterSource {
    rows: IndexMap<SubjectId, Vec<RecordRow>>,
    next_record: u64,
}

impl MemoryEncounterSource {
    /// An empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an encounter for `subject`
    pub fn insert_encounter(
        &mut self,
        subject: impl Into<SubjectId>,
        encounter_type: &str,
        location: &str,
        provider: &str,
        datetime: DateTime<Utc>,
    ) {
        self.next_record += 1;
        let attributes = IndexMap::from([
            ("location".to_string(), DataValue::from(location)),
            ("provider".to_string(), DataValue::from(provider)),
        ]);
        let row = RecordRow {
            record: self.next_record,
            token: "ENCOUNTER".to_string(),
            category: None,
            value: DataValue::from(encounter_type),
            effective: datetime,
            attributes,
        };
        self.rows.entry(subject.into()).or_default().push(row);
    }

    /// What a fact's payload is for the requested token
    fn payload(row: &RecordRow, target: &FieldTarget) -> Option<DataValue> {
        match target {
            FieldTarget::Primary => Some(row.value.clone()),
            FieldTarget::Attribute(name) => row.attributes.get(name).cloned(),
            FieldTarget::Category(_) => None,
        }
    }
}

impl FieldMap for MemoryEncounterSource {
    fn source_name(&self) -> &str {
        "encounter"
    }

    fn resolve(&self, token: &str) -> Option<FieldTarget> {
        FIELDS.get(token).cloned()
    }

    fn allows(&self, op: Operator, target: &FieldTarget) -> bool {
        match target {
            FieldTarget::Attribute(_) => {
                matches!(op, Operator::Equal | Operator::Contains | Operator::In)
            }
            _ => true,
        }
    }
}

impl DataSource for MemoryEncounterSource {
    fn name(&self) -> &str {
        "encounter"
    }

    fn default_ttl(&self) -> u64 {
        DEFAULT_TTL
    }

    fn keys(&self) -> Vec<String> {
        FIELDS.keys().map(ToString::to_string).collect()
    }

    fn has_key(&self, key: &str) -> bool {
        FIELDS.contains_key(key)
    }

    fn read(&self, request: &ReadRequest<'_>) -> LogicResult<ResultMap> {
        let root = request
            .criteria()
            .root_token()
            .ok_or_else(|| LogicError::malformed("criteria has no root token"))?;
        let target = self
            .resolve(root)
            .ok_or_else(|| LogicError::unknown_token(root, "encounter"))?;
        let mut translator = Translator::new(self, request.index_date());
        let criterion = translator.translate(request.criteria().expression())?;
        debug!(
            "encounter read for {root} over {} subjects: {}",
            request.cohort().len(),
            criterion
                .as_ref()
                .map_or_else(|| "unrestricted".to_string(), ToString::to_string)
        );
        let mut results = ResultMap::new();
        for subject in request.cohort() {
            let Some(rows) = self.rows.get(subject) else {
                continue;
            };
            let mut facts = Facts::empty();
            for row in rows {
                if !criterion.as_ref().is_none_or(|c| row.matches(c)) {
                    continue;
                }
                if let Some(payload) = Self::payload(row, &target) {
                    facts.push(row.fact_with(payload));
                }
            }
            if !facts.is_empty() {
                results.insert(subject.clone(), facts);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use octofhir_logic_ast::Criteria;
    use octofhir_logic_types::Cohort;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap()
    }

    fn source() -> MemoryEncounterSource {
        let mut source = MemoryEncounterSource::new();
        source.insert_encounter("P1", "ADULTRETURN", "Clinic A", "Dr. Mwangi", day(2));
        source.insert_encounter("P1", "ADULTINITIAL", "Clinic B", "Dr. Okafor", day(8));
        source.insert_encounter("P2", "PEDSINITIAL", "Clinic A", "Dr. Okafor", day(5));
        source
    }

    #[test]
    fn test_location_token_yields_location_values() {
        let source = source();
        let cohort: Cohort = ["P1", "P2"].into_iter().collect();
        let criteria = Criteria::token("LOCATION").equal_to("Clinic A").unwrap();
        let request = ReadRequest::new(day(15), &cohort, &criteria);
        let results = source.read(&request).unwrap();

        assert_eq!(results.len(), 2);
        let p1 = &results[&SubjectId::from("P1")];
        assert_eq!(p1.len(), 1);
        assert_eq!(p1.first().unwrap().value(), &DataValue::from("Clinic A"));
    }

    #[test]
    fn test_encounter_token_filtered_by_location_attribute() {
        let source = source();
        let cohort: Cohort = ["P1"].into_iter().collect();
        let criteria = Criteria::token("ENCOUNTER").and(
            Criteria::token("LOCATION").equal_to("Clinic B").unwrap(),
        );
        let request = ReadRequest::new(day(15), &cohort, &criteria);
        let results = source.read(&request).unwrap();

        let p1 = &results[&SubjectId::from("P1")];
        assert_eq!(p1.len(), 1);
        assert_eq!(p1.first().unwrap().value(), &DataValue::from("ADULTINITIAL"));
    }

    #[test]
    fn test_ordering_comparison_on_provider_is_rejected() {
        let source = source();
        let cohort: Cohort = ["P1"].into_iter().collect();
        let criteria = Criteria::token("PROVIDER").gt(5).unwrap();
        let request = ReadRequest::new(day(15), &cohort, &criteria);
        let err = source.read(&request).unwrap_err();
        assert!(matches!(err, LogicError::UnsupportedOperator { .. }));
    }
}

//! In-memory observation source

use super::RecordRow;
use crate::source::{DataSource, ReadRequest};
use crate::translate::{FieldMap, FieldTarget, Translator};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::debug;
use octofhir_logic_ast::Operator;
use octofhir_logic_diagnostics::{LogicError, LogicResult};
use octofhir_logic_types::{Concept, DataValue, Facts, ResultMap, SubjectId};

/// Seconds a fetched observation batch stays fresh
const DEFAULT_TTL: u64 = 30 * 60;

/// Observation rows categorized by a concept dictionary.
///
/// Every token this source answers is a concept name; there are no
/// structural tokens, so token resolution is exactly the category fallback.
#[derive(Default)]
pub struct MemoryObservationSource {
    concepts: IndexMap<String, Concept>,
    rows: IndexMap<SubjectId, Vec<RecordRow>>,
    next_record: u64,
}

impl MemoryObservationSource {
    /// An empty source with an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a concept to the dictionary this source can answer
    pub fn define_concept(&mut self, concept: Concept) {
        self.concepts.insert(concept.name().to_string(), concept);
    }

    /// Record an observation for `subject` under a defined concept
    pub fn insert(
        &mut self,
        subject: impl Into<SubjectId>,
        concept_name: &str,
        value: impl Into<DataValue>,
        effective: DateTime<Utc>,
    ) -> LogicResult<()> {
        let concept = self
            .concepts
            .get(concept_name)
            .cloned()
            .ok_or_else(|| LogicError::unknown_token(concept_name, "observation"))?;
        self.next_record += 1;
        let row = RecordRow {
            record: self.next_record,
            token: concept_name.to_string(),
            category: Some(concept),
            value: value.into(),
            effective,
            attributes: IndexMap::new(),
        };
        self.rows.entry(subject.into()).or_default().push(row);
        Ok(())
    }
}

impl FieldMap for MemoryObservationSource {
    fn source_name(&self) -> &str {
        "observation"
    }

    fn resolve(&self, token: &str) -> Option<FieldTarget> {
        self.concepts.get(token).cloned().map(FieldTarget::Category)
    }

    fn allows(&self, _op: Operator, _target: &FieldTarget) -> bool {
        true
    }
}

impl DataSource for MemoryObservationSource {
    fn name(&self) -> &str {
        "observation"
    }

    fn default_ttl(&self) -> u64 {
        DEFAULT_TTL
    }

    fn keys(&self) -> Vec<String> {
        self.concepts.keys().cloned().collect()
    }

    fn has_key(&self, key: &str) -> bool {
        self.concepts.contains_key(key)
    }

    fn read(&self, request: &ReadRequest<'_>) -> LogicResult<ResultMap> {
        let mut translator = Translator::new(self, request.index_date());
        let criterion = translator.translate(request.criteria().expression())?;
        debug!(
            "observation read over {} subjects: {}",
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
                if criterion.as_ref().is_none_or(|c| row.matches(c)) {
                    facts.push(row.fact_with(row.value.clone()));
                }
            }
            if !facts.is_empty() {
                results.insert(subject.clone(), facts);
            }
        }
        Ok(results)
    }
}

//! In-memory person (demographics) source

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

/// Seconds a fetched demographics batch stays fresh
const DEFAULT_TTL: u64 = 60 * 60 * 24;

static FIELDS: Lazy<IndexMap<&'static str, FieldTarget>> = Lazy::new(|| {
    IndexMap::from([
        ("GENDER", FieldTarget::Primary),
        ("BIRTHDATE", FieldTarget::Primary),
        ("DEAD", FieldTarget::Primary),
        ("DEATH DATE", FieldTarget::Primary),
    ])
});

/// Demographic facts stored as one row per token per person.
///
/// Birthdate rows carry the birthdate both as payload and effective date,
/// so date comparisons against either field agree.
#[derive(Default)]
pub struct MemoryPersonSource {
    rows: IndexMap<SubjectId, Vec<RecordRow>>,
    next_record: u64,
}

impl MemoryPersonSource {
    /// An empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a person's demographics for `subject`
    pub fn insert_person(
        &mut self,
        subject: impl Into<SubjectId>,
        gender: &str,
        birthdate: DateTime<Utc>,
        dead: bool,
        death_date: Option<DateTime<Utc>>,
    ) {
        let subject = subject.into();
        let vital_effective = death_date.unwrap_or(birthdate);
        self.push_row(subject.clone(), "GENDER", DataValue::from(gender), birthdate);
        self.push_row(
            subject.clone(),
            "BIRTHDATE",
            DataValue::Datetime(birthdate),
            birthdate,
        );
        self.push_row(
            subject.clone(),
            "DEAD",
            DataValue::Boolean(dead),
            vital_effective,
        );
        if let Some(death) = death_date {
            self.push_row(subject, "DEATH DATE", DataValue::Datetime(death), death);
        }
    }

    fn push_row(
        &mut self,
        subject: SubjectId,
        token: &str,
        value: DataValue,
        effective: DateTime<Utc>,
    ) {
        self.next_record += 1;
        let row = RecordRow {
            record: self.next_record,
            token: token.to_string(),
            category: None,
            value,
            effective,
            attributes: IndexMap::new(),
        };
        self.rows.entry(subject).or_default().push(row);
    }
}

impl FieldMap for MemoryPersonSource {
    fn source_name(&self) -> &str {
        "person"
    }

    fn resolve(&self, token: &str) -> Option<FieldTarget> {
        FIELDS.get(token).cloned()
    }

    fn allows(&self, _op: Operator, _target: &FieldTarget) -> bool {
        true
    }
}

impl DataSource for MemoryPersonSource {
    fn name(&self) -> &str {
        "person"
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
        if !self.has_key(root) {
            return Err(LogicError::unknown_token(root, "person"));
        }
        let mut translator = Translator::new(self, request.index_date());
        let criterion = translator.translate(request.criteria().expression())?;
        debug!(
            "person read for {root} over {} subjects",
            request.cohort().len()
        );
        let mut results = ResultMap::new();
        for subject in request.cohort() {
            let Some(rows) = self.rows.get(subject) else {
                continue;
            };
            let mut facts = Facts::empty();
            for row in rows {
                if row.token == root && criterion.as_ref().is_none_or(|c| row.matches(c)) {
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

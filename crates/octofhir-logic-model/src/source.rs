//! Data-source contracts and registry

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use octofhir_logic_ast::Criteria;
use octofhir_logic_diagnostics::LogicResult;
use octofhir_logic_types::{Cohort, ResultMap};
use std::sync::Arc;

/// One batched fetch: the reference date, the cohort to cover and the
/// criteria restricting which facts qualify.
pub struct ReadRequest<'a> {
    index_date: DateTime<Utc>,
    cohort: &'a Cohort,
    criteria: &'a Criteria,
}

impl<'a> ReadRequest<'a> {
    /// Build a request covering `cohort` as of `index_date`
    pub fn new(index_date: DateTime<Utc>, cohort: &'a Cohort, criteria: &'a Criteria) -> Self {
        Self {
            index_date,
            cohort,
            criteria,
        }
    }

    /// The evaluation's reference "now"
    pub const fn index_date(&self) -> DateTime<Utc> {
        self.index_date
    }

    /// Subjects the fetch must cover
    pub const fn cohort(&self) -> &'a Cohort {
        self.cohort
    }

    /// What to fetch
    pub const fn criteria(&self) -> &'a Criteria {
        self.criteria
    }
}

/// A pluggable provider of raw dated facts.
///
/// `read` fetches for the whole cohort in one pass and returns a per-subject
/// map; subjects without qualifying facts are simply absent. Transforms on
/// the criteria are not the source's concern; the evaluation layer applies
/// them after fetch.
pub trait DataSource: Send + Sync {
    /// Unique source name
    fn name(&self) -> &str;

    /// Seconds a fetched result stays fresh; 0 disables caching
    fn default_ttl(&self) -> u64;

    /// Tokens this source can answer
    fn keys(&self) -> Vec<String>;

    /// Whether this source can answer `key`
    fn has_key(&self, key: &str) -> bool {
        self.keys().iter().any(|k| k == key)
    }

    /// Fetch qualifying facts for every subject in the request's cohort
    fn read(&self, request: &ReadRequest<'_>) -> LogicResult<ResultMap>;
}

/// Explicit registry mapping source names to implementations.
///
/// Constructed at startup and passed by reference into evaluation contexts;
/// there is no process-global source state.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: IndexMap<String, Arc<dyn DataSource>>,
}

impl SourceRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own name, replacing any prior entry
    pub fn register(&mut self, source: Arc<dyn DataSource>) {
        self.sources.insert(source.name().to_string(), source);
    }

    /// Look up a source by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.sources.get(name).cloned()
    }

    /// Registered source names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no sources are registered
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

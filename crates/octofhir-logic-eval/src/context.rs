//! The evaluation context.
//!
//! A [`LogicContext`] ties together the rule registry, the data sources and
//! the cache for one evaluation session. It fixes the active cohort and the
//! index date every rule answers relative to. Evaluation always runs over
//! the full cohort even when a single subject's answer is requested, and the
//! whole batch is cached under one key so the remaining subjects are served
//! without recomputation.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use octofhir_logic_ast::{Criteria, Parameters};
use octofhir_logic_diagnostics::{LogicError, LogicResult};
use octofhir_logic_model::{ReadRequest, SourceRegistry};
use octofhir_logic_types::{Cohort, Facts, ResultMap, SubjectId};

use crate::aggregate;
use crate::cache::{CacheKey, LogicCache};
use crate::registry::RuleRegistry;

/// One evaluation session over a fixed cohort.
pub struct LogicContext<'a> {
    index_date: DateTime<Utc>,
    cohort: Cohort,
    parameters: Option<Parameters>,
    rules: &'a RuleRegistry,
    sources: &'a SourceRegistry,
    cache: &'a dyn LogicCache,
}

impl<'a> LogicContext<'a> {
    /// Context over `cohort` with the index date set to now.
    pub fn new(
        rules: &'a RuleRegistry,
        sources: &'a SourceRegistry,
        cache: &'a dyn LogicCache,
        cohort: Cohort,
    ) -> Self {
        Self {
            index_date: Utc::now(),
            cohort,
            parameters: None,
            rules,
            sources,
            cache,
        }
    }

    /// Pins the index date.
    #[must_use]
    pub fn with_index_date(mut self, index_date: DateTime<Utc>) -> Self {
        self.index_date = index_date;
        self
    }

    /// Sets session-wide parameters, visible to every rule.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Moves the index date of this context.
    pub fn set_index_date(&mut self, index_date: DateTime<Utc>) {
        self.index_date = index_date;
    }

    /// Date every result is interpreted relative to.
    pub const fn index_date(&self) -> DateTime<Utc> {
        self.index_date
    }

    /// Subjects evaluated by this context.
    pub const fn cohort(&self) -> &Cohort {
        &self.cohort
    }

    /// Session-wide parameters, if any.
    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    /// Sibling context anchored at a different index date.
    fn child(&self, index_date: DateTime<Utc>) -> LogicContext<'a> {
        LogicContext {
            index_date,
            cohort: self.cohort.clone(),
            parameters: self.parameters.clone(),
            rules: self.rules,
            sources: self.sources,
            cache: self.cache,
        }
    }

    /// Evaluates `criteria` and returns one subject's results.
    ///
    /// Subjects outside the cohort, and cohort members the rule produced
    /// nothing for, get an empty list.
    pub fn eval(&self, subject: &SubjectId, criteria: &Criteria) -> LogicResult<Facts> {
        self.eval_with(subject, criteria, None)
    }

    /// Like [`eval`](Self::eval) with call-site parameters layered on top of
    /// the session and criteria parameters.
    pub fn eval_with(
        &self,
        subject: &SubjectId,
        criteria: &Criteria,
        call_parameters: Option<&Parameters>,
    ) -> LogicResult<Facts> {
        let results = self.eval_batch(criteria, call_parameters)?;
        Ok(results.get(subject).cloned().unwrap_or_else(Facts::empty))
    }

    /// Evaluates `criteria` for the whole cohort.
    pub fn eval_cohort(&self, criteria: &Criteria) -> LogicResult<ResultMap> {
        self.eval_batch(criteria, None)
    }

    fn eval_batch(
        &self,
        criteria: &Criteria,
        call_parameters: Option<&Parameters>,
    ) -> LogicResult<ResultMap> {
        if let Some(reference_date) = criteria.as_of_date() {
            if reference_date != self.index_date {
                debug!("delegating to a context anchored at {reference_date}");
                return self
                    .child(reference_date)
                    .eval_batch(criteria, call_parameters);
            }
        }
        let token = criteria
            .root_token()
            .ok_or_else(|| LogicError::malformed("criteria names no token"))?;
        let rule = self
            .rules
            .get(token)
            .ok_or_else(|| LogicError::unresolved_token(token))?;
        if let Some(source) = rule.reference() {
            return self.read_batch(source, criteria, call_parameters);
        }

        let merged = self.merged_parameters(criteria, call_parameters);
        let ttl = rule.ttl();
        let key = (ttl > 0)
            .then(|| CacheKey::for_rule(criteria, merged.as_ref(), self.index_date, &self.cohort));
        if let Some(key) = &key {
            if let Some(results) = self.cache_get(key) {
                debug!("rule '{token}': served from cache");
                return Ok(results);
            }
        }

        debug!(
            "evaluating rule '{token}' over a cohort of {}",
            self.cohort.len()
        );
        let parameters = merged.unwrap_or_default();
        let mut results = ResultMap::new();
        for member in &self.cohort {
            let facts = rule.eval(self, member, &parameters).map_err(|cause| {
                LogicError::evaluation_caused(
                    format!("rule '{token}' failed for subject '{member}'"),
                    cause,
                )
            })?;
            if !facts.is_empty() {
                results.insert(member.clone(), facts);
            }
        }
        let results =
            aggregate::apply(criteria.transform(), results, &self.cohort, self.index_date, token)?;
        if let Some(key) = key {
            self.cache_put(key, results.clone(), ttl);
        }
        Ok(results)
    }

    /// Reads `criteria` straight from a data source for one subject.
    pub fn read(
        &self,
        subject: &SubjectId,
        source: &str,
        criteria: &Criteria,
    ) -> LogicResult<Facts> {
        let results = self.read_batch(source, criteria, None)?;
        Ok(results.get(subject).cloned().unwrap_or_else(Facts::empty))
    }

    /// Reads `criteria` straight from a data source for the whole cohort.
    pub fn read_cohort(&self, source: &str, criteria: &Criteria) -> LogicResult<ResultMap> {
        self.read_batch(source, criteria, None)
    }

    fn read_batch(
        &self,
        source_name: &str,
        criteria: &Criteria,
        call_parameters: Option<&Parameters>,
    ) -> LogicResult<ResultMap> {
        let source = self
            .sources
            .get(source_name)
            .ok_or_else(|| LogicError::unresolved_source(source_name))?;
        let merged = self.merged_parameters(criteria, call_parameters);
        let ttl = source.default_ttl();
        let key = (ttl > 0).then(|| {
            CacheKey::for_source(
                criteria,
                merged.as_ref(),
                source_name,
                self.index_date,
                &self.cohort,
            )
        });
        if let Some(key) = &key {
            if let Some(results) = self.cache_get(key) {
                debug!("source '{source_name}': served from cache");
                return Ok(results);
            }
        }

        let request = ReadRequest::new(self.index_date, &self.cohort, criteria);
        let fetched = source.read(&request)?;
        let entity = criteria.root_token().unwrap_or(source_name);
        let results =
            aggregate::apply(criteria.transform(), fetched, &self.cohort, self.index_date, entity)?;
        if let Some(key) = key {
            self.cache_put(key, results.clone(), ttl);
        }
        Ok(results)
    }

    /// Session, criteria and call parameters folded left to right, later
    /// layers overriding earlier ones.
    fn merged_parameters(
        &self,
        criteria: &Criteria,
        call_parameters: Option<&Parameters>,
    ) -> Option<Parameters> {
        let mut merged = self.parameters.clone();
        if let Some(own) = criteria.parameters() {
            merged
                .get_or_insert_with(Parameters::new)
                .extend(own.iter().map(|(name, value)| (name.clone(), value.clone())));
        }
        if let Some(call) = call_parameters {
            merged
                .get_or_insert_with(Parameters::new)
                .extend(call.iter().map(|(name, value)| (name.clone(), value.clone())));
        }
        merged
    }

    fn cache_get(&self, key: &CacheKey) -> Option<ResultMap> {
        match self.cache.get(key) {
            Ok(found) => found,
            Err(error) => {
                warn!("cache read failed, treating as a miss: {error}");
                None
            }
        }
    }

    fn cache_put(&self, key: CacheKey, results: ResultMap, ttl: u64) {
        if let Err(error) = self.cache.put(key, results, ttl) {
            warn!("cache write failed, batch not stored: {error}");
        }
    }
}

impl std::fmt::Debug for LogicContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicContext")
            .field("index_date", &self.index_date)
            .field("cohort", &self.cohort)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

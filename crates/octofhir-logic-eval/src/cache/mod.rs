//! Result caching for evaluated cohort batches.
//!
//! Caching is keyed on the full identity of a request ([`CacheKey`]) and
//! bounded by a per-entry time to live chosen by the rule or data source
//! that produced the results. A time to live of zero disables caching for
//! that producer entirely. Backends are pluggable; the context treats any
//! backend failure as a miss.
//!
//! The cache is the one piece of state shared between contexts. Writers
//! racing on one key are permitted and the last write wins; there is no
//! per-key lock, so concurrent callers may redundantly recompute the same
//! batch before the first write lands.

use octofhir_logic_diagnostics::LogicResult;
use octofhir_logic_types::ResultMap;

mod key;
mod memory;
mod noop;

pub use key::CacheKey;
pub use memory::{CacheStats, MemoryCache};
pub use noop::NoopCache;

/// Storage backend for evaluated results.
pub trait LogicCache: Send + Sync {
    /// Looks up a fresh entry. Expired entries count as absent.
    fn get(&self, key: &CacheKey) -> LogicResult<Option<ResultMap>>;

    /// Stores `results` for `ttl_seconds`. A zero time to live stores nothing.
    fn put(&self, key: CacheKey, results: ResultMap, ttl_seconds: u64) -> LogicResult<()>;

    /// Drops one entry if present.
    fn remove(&self, key: &CacheKey) -> LogicResult<()>;

    /// Drops every expired entry.
    fn clean(&self) -> LogicResult<()>;
}

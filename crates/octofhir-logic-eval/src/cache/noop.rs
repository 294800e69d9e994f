//! Backend that caches nothing.

use octofhir_logic_diagnostics::LogicResult;
use octofhir_logic_types::ResultMap;

use super::{CacheKey, LogicCache};

/// Always misses and discards every store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl LogicCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> LogicResult<Option<ResultMap>> {
        Ok(None)
    }

    fn put(&self, _key: CacheKey, _results: ResultMap, _ttl_seconds: u64) -> LogicResult<()> {
        Ok(())
    }

    fn remove(&self, _key: &CacheKey) -> LogicResult<()> {
        Ok(())
    }

    fn clean(&self) -> LogicResult<()> {
        Ok(())
    }
}

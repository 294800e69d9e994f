//! Evaluation engine for clinical logic criteria.
//!
//! This crate hosts the runtime side of the library: the [`LogicContext`]
//! that batches rule evaluation over a cohort, the [`Rule`] trait with its
//! built-in implementations, result transforms and the TTL cache in front
//! of rules and data sources.

pub mod aggregate;
mod cache;
mod context;
mod registry;
mod rule;

pub use cache::{CacheKey, CacheStats, LogicCache, MemoryCache, NoopCache};
pub use context::LogicContext;
pub use registry::RuleRegistry;
pub use rule::{AgeRule, ReferenceRule, Rule};

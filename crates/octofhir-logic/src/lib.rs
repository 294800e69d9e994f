//! Clinical logic rule evaluation for Rust
//!
//! This crate evaluates declarative rule criteria against cohorts of
//! subject records and returns typed, dated results. It provides:
//! - A fluent criteria builder with filters, reference dates and windows
//! - Translation of criteria into data source predicates
//! - Post-fetch transforms (first, last, count, average, distinct, exists)
//! - Cohort-batched evaluation with per-rule TTL caching
//!
//! # Example
//!
//! ```ignore
//! use octofhir_logic::{Criteria, LogicContext};
//!
//! let low_cd4 = Criteria::token("CD4 COUNT").lt(200)?.last();
//! let result = context.eval(&subject, &low_cd4)?;
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_logic_ast as ast;
pub use octofhir_logic_diagnostics as diagnostics;
pub use octofhir_logic_eval as eval;
pub use octofhir_logic_model as model;
pub use octofhir_logic_types as types;

// Convenience re-exports
pub use octofhir_logic_ast::{Criteria, Duration, Operand, Operator, Parameters};
pub use octofhir_logic_diagnostics::{LogicError, LogicResult};
pub use octofhir_logic_eval::{
    AgeRule, LogicCache, LogicContext, MemoryCache, NoopCache, ReferenceRule, Rule, RuleRegistry,
};
pub use octofhir_logic_model::{DataSource, SourceRegistry};
pub use octofhir_logic_types::{Cohort, Concept, DataValue, Fact, Facts, ResultMap, SubjectId};

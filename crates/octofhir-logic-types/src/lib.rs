//! Runtime value types for logic evaluation
//!
//! This crate defines the data that flows out of rule and data-source
//! evaluation: typed datums ([`DataValue`]), dated facts with provenance
//! ([`Fact`]), the ordered per-subject result ([`Facts`]), coded category
//! references ([`Concept`]) and the cohort model ([`Cohort`], [`SubjectId`]).
//!
//! A per-subject result is an ordered sequence of facts, ordered by fact date
//! unless a transform reorders it. An empty sequence means "no value", which
//! is distinct from a present zero or `false`.

mod concept;
mod fact;
mod subject;
mod value;

pub use concept::*;
pub use fact::*;
pub use subject::*;
pub use value::*;

use indexmap::IndexMap;

/// Per-subject result map produced by a cohort batch evaluation
pub type ResultMap = IndexMap<SubjectId, Facts>;

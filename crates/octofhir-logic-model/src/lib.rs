//! Criterion translation and data-source contracts
//!
//! This crate connects the expression model to fact storage. The
//! [`Translator`] lowers an expression tree plus a reference date into a
//! backend-agnostic [`Criterion`] predicate, guided by each source's
//! [`FieldMap`]. The [`DataSource`] trait and [`SourceRegistry`] define how
//! the evaluation layer reaches storage, and the `memory` module ships
//! in-memory observation, encounter and person sources that interpret
//! predicates directly.

mod criterion;
pub mod memory;
mod source;
mod translate;

pub use criterion::{CompareOp, Criterion, FieldRef};
pub use source::{DataSource, ReadRequest, SourceRegistry};
pub use translate::{FieldMap, FieldTarget, Translator};

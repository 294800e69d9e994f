//! Logic diagnostics and error handling
//!
//! This crate provides the error handling infrastructure for the logic
//! evaluation engine. Every user-facing failure, from parse and token
//! resolution through operator compatibility, translation and caching,
//! surfaces through the single [`LogicError`] type so callers keep one
//! uniform error channel.

mod error;

pub use error::*;

/// Result type for logic operations
pub type LogicResult<T> = std::result::Result<T, LogicError>;

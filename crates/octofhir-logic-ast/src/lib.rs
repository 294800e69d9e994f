//! Expression and criteria model for logic evaluation
//!
//! This crate defines what a caller asks the evaluator: operators and their
//! operand compatibility rules, relative durations, immutable expression
//! trees, and the fluent [`Criteria`] builder that wraps them together with
//! parameters and a cached root token.
//!
//! Building is infallible except where the static operator/operand
//! compatibility table rejects a pairing; that failure is reported at build
//! time, never deferred to evaluation.

mod criteria;
mod duration;
mod expression;
mod operand;
mod operator;

pub use criteria::{Criteria, Parameters};
pub use duration::{Duration, DurationUnit};
pub use expression::{CompareExpr, ComposeExpr, Expression, ExpressionKind, Transform};
pub use operand::Operand;
pub use operator::Operator;

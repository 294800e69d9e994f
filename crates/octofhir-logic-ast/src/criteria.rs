//! Criteria: the unit of "what to evaluate"
//!
//! A [`Criteria`] owns an expression tree plus an optional parameter map and
//! caches the root token at construction, so resolving the target rule or
//! data-source key is a field read rather than a tree walk. Every builder
//! method consumes `self` and returns a new value; an already-returned
//! criteria is never altered retroactively.
//!
//! The transform stays on the outermost expression: comparison, temporal and
//! negation steps wrapping a transformed criteria carry the transform up to
//! the new root, since they refine the same fetched stream. `and`/`or` start
//! a fresh composite stream, so attach transforms after combining.

use crate::duration::Duration;
use crate::expression::{Expression, Transform};
use crate::operand::Operand;
use crate::operator::Operator;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use octofhir_logic_diagnostics::{LogicError, LogicResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Named values a criteria carries into rule evaluation and cache keys
pub type Parameters = IndexMap<String, Operand>;

/// An expression tree, its cached root token and optional parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    expression: Expression,
    root_token: Option<String>,
    parameters: Option<Parameters>,
}

impl Criteria {
    /// A criteria targeting a bare token
    pub fn token(name: impl Into<String>) -> Self {
        Self::rebuilt(Expression::token(name), None)
    }

    /// Wrap an already-built expression, typically parser output
    pub fn from_expression(expression: Expression) -> Self {
        Self::rebuilt(expression, None)
    }

    fn rebuilt(expression: Expression, parameters: Option<Parameters>) -> Self {
        let root_token = expression.root_token().map(str::to_string);
        Self {
            expression,
            root_token,
            parameters,
        }
    }

    fn comparison(self, op: Operator, operand: Operand) -> LogicResult<Self> {
        if !operand.supports(op) {
            return Err(LogicError::unsupported_operator(
                op.symbol(),
                &self.expression,
                format!("{operand} ({})", operand.datatype_name()),
            ));
        }
        let parameters = self.parameters;
        let expression = wrap_keeping_transform(self.expression, |e| e.compare(op, operand));
        Ok(Self::rebuilt(expression, parameters))
    }

    /// Require equality with `operand`
    pub fn equal_to(self, operand: impl Into<Operand>) -> LogicResult<Self> {
        self.comparison(Operator::Equal, operand.into())
    }

    /// Require a value strictly below `operand`
    pub fn lt(self, operand: impl Into<Operand>) -> LogicResult<Self> {
        self.comparison(Operator::Less, operand.into())
    }

    /// Require a value at or below `operand`
    pub fn lte(self, operand: impl Into<Operand>) -> LogicResult<Self> {
        self.comparison(Operator::LessOrEqual, operand.into())
    }

    /// Require a value strictly above `operand`
    pub fn gt(self, operand: impl Into<Operand>) -> LogicResult<Self> {
        self.comparison(Operator::Greater, operand.into())
    }

    /// Require a value at or above `operand`
    pub fn gte(self, operand: impl Into<Operand>) -> LogicResult<Self> {
        self.comparison(Operator::GreaterOrEqual, operand.into())
    }

    /// Require containment of `operand`
    pub fn contains(self, operand: impl Into<Operand>) -> LogicResult<Self> {
        self.comparison(Operator::Contains, operand.into())
    }

    /// Require membership in a collection of operands
    pub fn is_in(self, operands: Vec<Operand>) -> LogicResult<Self> {
        self.comparison(Operator::In, Operand::Collection(operands))
    }

    /// Require facts strictly before `date`
    pub fn before(self, date: DateTime<Utc>) -> Self {
        let parameters = self.parameters;
        let expression = wrap_keeping_transform(self.expression, |e| {
            e.compare(Operator::Before, Operand::Date(date))
        });
        Self::rebuilt(expression, parameters)
    }

    /// Require facts strictly after `date`
    pub fn after(self, date: DateTime<Utc>) -> Self {
        let parameters = self.parameters;
        let expression = wrap_keeping_transform(self.expression, |e| {
            e.compare(Operator::After, Operand::Date(date))
        });
        Self::rebuilt(expression, parameters)
    }

    /// Evaluate as of `date` instead of the context index date
    pub fn as_of(self, date: DateTime<Utc>) -> Self {
        let parameters = self.parameters;
        let expression = wrap_keeping_transform(self.expression, |e| {
            e.compare(Operator::AsOf, Operand::Date(date))
        });
        Self::rebuilt(expression, parameters)
    }

    /// Require facts within `duration` of the reference date;
    /// a negative duration reaches into the past.
    pub fn within(self, duration: Duration) -> Self {
        let parameters = self.parameters;
        let expression = wrap_keeping_transform(self.expression, |e| {
            e.compare(Operator::Within, Operand::Duration(duration))
        });
        Self::rebuilt(expression, parameters)
    }

    /// Negate the whole criteria
    pub fn negate(self) -> Self {
        let parameters = self.parameters;
        let expression = wrap_keeping_transform(self.expression, Expression::negate);
        Self::rebuilt(expression, parameters)
    }

    /// Conjoin with another criteria; parameter maps merge, with the
    /// right-hand side winning on key collisions.
    pub fn and(self, other: Criteria) -> Self {
        let parameters = merge_parameters(self.parameters, other.parameters);
        Self::rebuilt(
            self.expression.compose(Operator::And, other.expression),
            parameters,
        )
    }

    /// Disjoin with another criteria; parameter maps merge as with
    /// [`Criteria::and`].
    pub fn or(self, other: Criteria) -> Self {
        let parameters = merge_parameters(self.parameters, other.parameters);
        Self::rebuilt(
            self.expression.compose(Operator::Or, other.expression),
            parameters,
        )
    }

    fn transformed(self, transform: Transform) -> Self {
        let parameters = self.parameters;
        Self::rebuilt(self.expression.with_transform(transform), parameters)
    }

    /// Keep only the earliest fact
    pub fn first(self) -> Self {
        self.transformed(Transform::new(Operator::First))
    }

    /// Keep the `count` earliest facts, ascending by date
    pub fn first_n(self, count: usize) -> Self {
        self.transformed(Transform::new(Operator::First).with_count(count))
    }

    /// Keep only the most recent fact
    pub fn last(self) -> Self {
        self.transformed(Transform::new(Operator::Last))
    }

    /// Keep the `count` most recent facts, descending by date
    pub fn last_n(self, count: usize) -> Self {
        self.transformed(Transform::new(Operator::Last).with_count(count))
    }

    /// Replace the result with the number of facts
    pub fn count(self) -> Self {
        self.transformed(Transform::new(Operator::Count))
    }

    /// Replace the result with the mean of its numeric facts
    pub fn average(self) -> Self {
        self.transformed(Transform::new(Operator::Average))
    }

    /// Drop duplicate facts
    pub fn distinct(self) -> Self {
        self.transformed(Transform::new(Operator::Distinct))
    }

    /// Coerce the result to true when any fact is present
    pub fn exists(self) -> Self {
        self.transformed(Transform::new(Operator::Exists))
    }

    /// Coerce the result to true when no fact is present
    pub fn not_exists(self) -> Self {
        self.transformed(Transform::new(Operator::NotExists))
    }

    /// Attach an arbitrary transform, replacing any prior one
    pub fn with_transform(self, transform: Transform) -> Self {
        self.transformed(transform)
    }

    /// Attach a named parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.parameters
            .get_or_insert_with(Parameters::new)
            .insert(key.into(), value.into());
        self
    }

    /// The expression tree
    pub const fn expression(&self) -> &Expression {
        &self.expression
    }

    /// The cached root token
    pub fn root_token(&self) -> Option<&str> {
        self.root_token.as_deref()
    }

    /// The attached parameters, if any
    pub const fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    /// The outermost transform, if any
    pub const fn transform(&self) -> Option<&Transform> {
        self.expression.transform.as_ref()
    }

    /// The explicit "as of" date carried by the expression, if any
    pub fn as_of_date(&self) -> Option<DateTime<Utc>> {
        self.expression.as_of_date()
    }
}

fn merge_parameters(
    left: Option<Parameters>,
    right: Option<Parameters>,
) -> Option<Parameters> {
    match (left, right) {
        (None, None) => None,
        (Some(p), None) | (None, Some(p)) => Some(p),
        (Some(mut l), Some(r)) => {
            l.extend(r);
            Some(l)
        }
    }
}

fn wrap_keeping_transform(
    mut expression: Expression,
    wrap: impl FnOnce(Expression) -> Expression,
) -> Expression {
    let transform = expression.transform.take();
    let mut wrapped = wrap(expression);
    wrapped.transform = transform;
    wrapped
}

// Parameter maps compare order-insensitively, so hashing walks the keys in
// sorted order to stay consistent with equality.
impl Hash for Criteria {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expression.hash(state);
        if let Some(parameters) = &self.parameters {
            let mut keys: Vec<&String> = parameters.keys().collect();
            keys.sort_unstable();
            for key in keys {
                key.hash(state);
                parameters.get(key).hash(state);
            }
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(criteria: &Criteria) -> u64 {
        let mut hasher = DefaultHasher::new();
        criteria.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_builder_leaves_prior_criteria_untouched() {
        let base = Criteria::token("CD4 COUNT").lt(200).unwrap();
        let rendered = base.to_string();
        let _extended = base.clone().and(Criteria::token("GENDER").equal_to("F").unwrap());
        assert_eq!(base.to_string(), rendered);
        assert_eq!(base.root_token(), Some("CD4 COUNT"));
    }

    #[test]
    fn test_invalid_pairing_is_rejected() {
        let err = Criteria::token("CD4 COUNT")
            .lt("two hundred")
            .expect_err("text must not support <");
        assert_eq!(
            err,
            LogicError::unsupported_operator("<", "CD4 COUNT", "\"two hundred\" (text)")
        );
    }

    #[test]
    fn test_cached_root_token_tracks_composition() {
        let criteria = Criteria::token("CD4 COUNT")
            .lt(200)
            .unwrap()
            .and(Criteria::token("LOCATION").equal_to("Clinic A").unwrap())
            .negate();
        assert_eq!(criteria.root_token(), Some("CD4 COUNT"));
        assert_eq!(criteria.root_token(), criteria.expression().root_token());
    }

    #[test]
    fn test_double_negation_builds() {
        let criteria = Criteria::token("DEAD").negate().negate();
        assert_eq!(criteria.to_string(), "not (not (DEAD))");
    }

    #[test]
    fn test_parameter_merge_right_wins() {
        let left = Criteria::token("A").with_parameter("threshold", 100).with_parameter("site", "x");
        let right = Criteria::token("B").with_parameter("threshold", 250);
        let merged = left.and(right);
        let parameters = merged.parameters().unwrap();
        assert_eq!(parameters.get("threshold"), Some(&Operand::from(250i64)));
        assert_eq!(parameters.get("site"), Some(&Operand::from("x")));
    }

    #[test]
    fn test_parameter_values_change_hash() {
        let a = Criteria::token("CD4 COUNT").with_parameter("threshold", 100);
        let b = Criteria::token("CD4 COUNT").with_parameter("threshold", 200);
        assert_ne!(a, b);
        assert_ne!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_parameter_order_does_not_change_identity() {
        let a = Criteria::token("X").with_parameter("p", 1).with_parameter("q", 2);
        let b = Criteria::token("X").with_parameter("q", 2).with_parameter("p", 1);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_transform_reattachment_replaces() {
        let criteria = Criteria::token("CD4 COUNT").first().last_n(3);
        assert_eq!(
            criteria.transform(),
            Some(&Transform::new(Operator::Last).with_count(3))
        );
    }

    #[test]
    fn test_as_of_date_surfaces() {
        let asof = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        let criteria = Criteria::token("CD4 COUNT").last().as_of(asof);
        assert_eq!(criteria.as_of_date(), Some(asof));
        // wrapping in a temporal step carried the transform to the new root
        assert_eq!(criteria.transform(), Some(&Transform::new(Operator::Last)));
    }

    #[test]
    fn test_transform_rides_through_comparison_wraps() {
        let criteria = Criteria::token("CD4 COUNT").last().lt(200).unwrap().negate();
        assert_eq!(criteria.transform(), Some(&Transform::new(Operator::Last)));
        assert_eq!(criteria.to_string(), "last not (CD4 COUNT < 200)");
    }
}

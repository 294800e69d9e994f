//! Expression tree nodes
//!
//! Expressions are immutable: every builder step wraps the prior expression
//! as the left child of a new node and returns the new root. Reusing an
//! already-built expression can therefore never be affected by later
//! composition.

use crate::operand::Operand;
use crate::operator::Operator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A post-fetch aggregation attached to the outermost expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transform {
    /// Transform or existence operator to apply
    pub op: Operator,
    /// How many facts to keep, for first/last
    pub count: Option<usize>,
    /// Ordering component for first/last; fact date when absent
    pub sort_by: Option<String>,
}

impl Transform {
    /// A transform applying `op` with no count or ordering override
    pub const fn new(op: Operator) -> Self {
        Self {
            op,
            count: None,
            sort_by: None,
        }
    }

    /// Keep at most `count` facts
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Order by the named result component instead of the fact date
    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if let Some(count) = self.count {
            write!(f, " {count}")?;
        }
        if let Some(sort_by) = &self.sort_by {
            write!(f, " by {sort_by}")?;
        }
        Ok(())
    }
}

/// One node of an expression tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// A bare token naming a rule, data-source key or structural field
    Token(String),
    /// Negation of a sub-expression
    Not(Box<Expression>),
    /// A comparison binding an operand to the expression on its left
    Compare(CompareExpr),
    /// A logical composition of two sub-expressions
    Compose(ComposeExpr),
}

/// Comparison node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompareExpr {
    /// Comparison or temporal operator
    pub op: Operator,
    /// What the comparison applies to
    pub left: Box<Expression>,
    /// Right-hand literal
    pub operand: Operand,
}

/// Logical composition node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComposeExpr {
    /// And or Or
    pub op: Operator,
    /// Left sub-expression
    pub left: Box<Expression>,
    /// Right sub-expression
    pub right: Box<Expression>,
}

/// An expression tree plus its optional outermost transform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression {
    /// Root node of the tree
    pub kind: ExpressionKind,
    /// At most one transform, attached to the outermost expression
    pub transform: Option<Transform>,
}

impl Expression {
    /// An expression consisting of a bare token
    pub fn token(name: impl Into<String>) -> Self {
        Self {
            kind: ExpressionKind::Token(name.into()),
            transform: None,
        }
    }

    /// Wrap this expression in a negation
    pub fn negate(self) -> Self {
        Self {
            kind: ExpressionKind::Not(Box::new(self)),
            transform: None,
        }
    }

    /// Bind `operand` to this expression with a comparison or temporal
    /// operator, wrapping this expression as the left side.
    pub fn compare(self, op: Operator, operand: Operand) -> Self {
        Self {
            kind: ExpressionKind::Compare(CompareExpr {
                op,
                left: Box::new(self),
                operand,
            }),
            transform: None,
        }
    }

    /// Compose this expression with another under And or Or
    pub fn compose(self, op: Operator, right: Expression) -> Self {
        Self {
            kind: ExpressionKind::Compose(ComposeExpr {
                op,
                left: Box::new(self),
                right: Box::new(right),
            }),
            transform: None,
        }
    }

    /// Attach a transform, replacing any previously attached one
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// The token reached by repeatedly descending the leftmost child
    pub fn root_token(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Token(name) => Some(name),
            ExpressionKind::Not(child) => child.root_token(),
            ExpressionKind::Compare(node) => node.left.root_token(),
            ExpressionKind::Compose(node) => node.left.root_token(),
        }
    }

    /// The shallowest explicit "as of" date carried by this tree, if any
    pub fn as_of_date(&self) -> Option<DateTime<Utc>> {
        match &self.kind {
            ExpressionKind::Token(_) => None,
            ExpressionKind::Not(child) => child.as_of_date(),
            ExpressionKind::Compare(node) => {
                if node.op == Operator::AsOf {
                    node.operand.as_date()
                } else {
                    node.left.as_of_date()
                }
            }
            ExpressionKind::Compose(node) => {
                node.left.as_of_date().or_else(|| node.right.as_of_date())
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(transform) = &self.transform {
            write!(f, "{transform} ")?;
        }
        match &self.kind {
            ExpressionKind::Token(name) => write!(f, "{name}"),
            ExpressionKind::Not(child) => write!(f, "not ({child})"),
            ExpressionKind::Compare(node) => {
                write!(f, "{} {} {}", node.left, node.op, node.operand)
            }
            ExpressionKind::Compose(node) => {
                write!(f, "({} {} {})", node.left, node.op, node.right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_root_token_is_leftmost_descent() {
        let expr = Expression::token("CD4 COUNT")
            .compare(Operator::Less, Operand::from(200i64))
            .compose(
                Operator::And,
                Expression::token("LOCATION").compare(Operator::Equal, Operand::from("Clinic A")),
            )
            .negate();
        assert_eq!(expr.root_token(), Some("CD4 COUNT"));
    }

    #[test]
    fn test_double_negation_stays_wrapped() {
        let expr = Expression::token("DEAD").negate().negate();
        let ExpressionKind::Not(inner) = &expr.kind else {
            panic!("outer negation missing");
        };
        assert!(matches!(inner.kind, ExpressionKind::Not(_)));
        assert_eq!(expr.root_token(), Some("DEAD"));
    }

    #[test]
    fn test_as_of_date_found_in_either_branch() {
        let asof = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        let left_only = Expression::token("CD4 COUNT").compare(Operator::AsOf, Operand::from(asof));
        assert_eq!(left_only.as_of_date(), Some(asof));

        let in_right = Expression::token("GENDER")
            .compare(Operator::Equal, Operand::from("F"))
            .compose(
                Operator::And,
                Expression::token("CD4 COUNT").compare(Operator::AsOf, Operand::from(asof)),
            );
        assert_eq!(in_right.as_of_date(), Some(asof));
    }

    #[test]
    fn test_transform_replacement() {
        let expr = Expression::token("CD4 COUNT")
            .with_transform(Transform::new(Operator::First))
            .with_transform(Transform::new(Operator::Last).with_count(2));
        assert_eq!(
            expr.transform,
            Some(Transform {
                op: Operator::Last,
                count: Some(2),
                sort_by: None
            })
        );
    }

    #[test]
    fn test_display_renders_tree() {
        let expr = Expression::token("CD4 COUNT")
            .compare(Operator::Less, Operand::from(200i64))
            .with_transform(Transform::new(Operator::Last));
        assert_eq!(expr.to_string(), "last CD4 COUNT < 200");
    }
}

//! Backend-agnostic query predicates
//!
//! A [`Criterion`] is what the translator hands a fact source: a composable
//! filter over fact records supporting conjunction, disjunction, negation,
//! equality, range and between. It never references a concrete backend;
//! the in-memory sources interpret it directly and a persistent backend
//! would compile it to its own query form.

use chrono::{DateTime, Utc};
use octofhir_logic_types::DataValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural field of a fact record a leaf predicate binds to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldRef {
    /// The date the fact became effective
    Effective,
    /// The coded category of the fact
    Category,
    /// The fact's value payload
    Value,
    /// A named structural attribute of the record
    Attribute(String),
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Effective => f.write_str("effective"),
            Self::Category => f.write_str("category"),
            Self::Value => f.write_str("value"),
            Self::Attribute(name) => write!(f, "{name}"),
        }
    }
}

/// Comparison kind of a leaf predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// Whether an ordering between actual and expected satisfies this op
    pub const fn accepts(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => matches!(ordering, Equal),
            Self::Lt => matches!(ordering, Less),
            Self::Lte => matches!(ordering, Less | Equal),
            Self::Gt => matches!(ordering, Greater),
            Self::Gte => matches!(ordering, Greater | Equal),
        }
    }

    /// Comparison symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// A composable predicate over fact records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Both children must hold
    And(Box<Criterion>, Box<Criterion>),
    /// Either child must hold
    Or(Box<Criterion>, Box<Criterion>),
    /// The child must not hold
    Not(Box<Criterion>),
    /// Compare a field against a value
    Compare {
        /// Field to compare
        field: FieldRef,
        /// Comparison kind
        op: CompareOp,
        /// Expected value
        value: DataValue,
    },
    /// Require a date field inside an inclusive window
    Between {
        /// Field to bound
        field: FieldRef,
        /// Inclusive lower bound
        low: DateTime<Utc>,
        /// Inclusive upper bound
        high: DateTime<Utc>,
    },
    /// Require a field to contain a value
    Contains {
        /// Field to test
        field: FieldRef,
        /// Contained value
        value: DataValue,
    },
    /// Require a field to equal one of several values
    In {
        /// Field to test
        field: FieldRef,
        /// Accepted values
        values: Vec<DataValue>,
    },
}

impl Criterion {
    /// Conjoin with another criterion
    pub fn and(self, other: Criterion) -> Criterion {
        Criterion::And(Box::new(self), Box::new(other))
    }

    /// Disjoin with another criterion
    pub fn or(self, other: Criterion) -> Criterion {
        Criterion::Or(Box::new(self), Box::new(other))
    }

    /// Negate this criterion
    pub fn negate(self) -> Criterion {
        Criterion::Not(Box::new(self))
    }

    /// Conjoin two optional contributions; a missing side contributes
    /// nothing rather than restricting.
    pub fn conjoin(left: Option<Criterion>, right: Option<Criterion>) -> Option<Criterion> {
        match (left, right) {
            (None, None) => None,
            (Some(c), None) | (None, Some(c)) => Some(c),
            (Some(l), Some(r)) => Some(l.and(r)),
        }
    }

    /// Disjoin two optional contributions; a missing side contributes
    /// nothing rather than widening.
    pub fn disjoin(left: Option<Criterion>, right: Option<Criterion>) -> Option<Criterion> {
        match (left, right) {
            (None, None) => None,
            (Some(c), None) | (None, Some(c)) => Some(c),
            (Some(l), Some(r)) => Some(l.or(r)),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(l, r) => write!(f, "({l} and {r})"),
            Self::Or(l, r) => write!(f, "({l} or {r})"),
            Self::Not(c) => write!(f, "not ({c})"),
            Self::Compare { field, op, value } => {
                write!(f, "{field} {} {value}", op.symbol())
            }
            Self::Between { field, low, high } => {
                write!(f, "{field} between {} and {}", low.to_rfc3339(), high.to_rfc3339())
            }
            Self::Contains { field, value } => write!(f, "{field} contains {value}"),
            Self::In { field, values } => {
                write!(f, "{field} in (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

//! Logic operators partitioned by role

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operators usable in a logic expression.
///
/// The partition matters: logical operators compose sub-expressions,
/// comparison and temporal operators bind an operand to the expression to
/// their left, existence operators coerce a result to a boolean, and
/// transform operators aggregate a fetched result after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // Logical
    /// Logical and
    And,
    /// Logical or
    Or,
    /// Logical negation
    Not,

    // Comparison
    /// Equality
    Equal,
    /// Less than
    Less,
    /// Less than or equal
    LessOrEqual,
    /// Greater than
    Greater,
    /// Greater than or equal
    GreaterOrEqual,
    /// Strictly earlier than a date
    Before,
    /// Strictly later than a date
    After,
    /// Containment (substring, set member, coded match)
    Contains,
    /// Membership in a collection operand
    In,

    // Temporal
    /// Override the reference date for everything to the left
    AsOf,
    /// Restrict to a window relative to the reference date
    Within,

    // Existence
    /// Coerce to true when any fact is present
    Exists,
    /// Coerce to true when no fact is present
    NotExists,

    // Transform
    /// Earliest fact(s)
    First,
    /// Most recent fact(s)
    Last,
    /// Number of facts
    Count,
    /// Arithmetic mean of numeric facts
    Average,
    /// Drop duplicate facts
    Distinct,
}

impl Operator {
    /// Check if this is a logical operator
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Not)
    }

    /// Check if this is a comparison operator
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::Less
                | Self::LessOrEqual
                | Self::Greater
                | Self::GreaterOrEqual
                | Self::Before
                | Self::After
                | Self::Contains
                | Self::In
        )
    }

    /// Check if this is a temporal operator
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::AsOf | Self::Within)
    }

    /// Check if this is an existence operator
    pub const fn is_existence(&self) -> bool {
        matches!(self, Self::Exists | Self::NotExists)
    }

    /// Check if this is a transform operator
    pub const fn is_transform(&self) -> bool {
        matches!(
            self,
            Self::First | Self::Last | Self::Count | Self::Average | Self::Distinct
        )
    }

    /// Get the operator symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Equal => "=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Before => "before",
            Self::After => "after",
            Self::Contains => "contains",
            Self::In => "in",
            Self::AsOf => "as of",
            Self::Within => "within",
            Self::Exists => "exists",
            Self::NotExists => "not exists",
            Self::First => "first",
            Self::Last => "last",
            Self::Count => "count",
            Self::Average => "average",
            Self::Distinct => "distinct",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

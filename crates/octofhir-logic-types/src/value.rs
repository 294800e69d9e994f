//! Typed datum values

use crate::Concept;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The typed payload of a single fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataValue {
    /// Boolean datum
    Boolean(bool),
    /// Coded datum (a dictionary concept)
    Coded(Concept),
    /// Date/time datum
    Datetime(DateTime<Utc>),
    /// Numeric datum
    Numeric(Decimal),
    /// Free-text datum
    Text(String),
}

/// Datatype tag for a [`DataValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Boolean,
    Coded,
    Datetime,
    Numeric,
    Text,
}

impl Datatype {
    /// Lowercase name used in messages
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Coded => "coded",
            Self::Datetime => "datetime",
            Self::Numeric => "numeric",
            Self::Text => "text",
        }
    }
}

impl DataValue {
    /// The datatype tag of this value
    pub const fn datatype(&self) -> Datatype {
        match self {
            Self::Boolean(_) => Datatype::Boolean,
            Self::Coded(_) => Datatype::Coded,
            Self::Datetime(_) => Datatype::Datetime,
            Self::Numeric(_) => Datatype::Numeric,
            Self::Text(_) => Datatype::Text,
        }
    }

    /// Boolean payload, if this is a boolean datum
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric payload, if this is a numeric datum
    pub const fn as_numeric(&self) -> Option<Decimal> {
        match self {
            Self::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Date/time payload, if this is a datetime datum
    pub const fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Datetime(d) => Some(*d),
            _ => None,
        }
    }

    /// Text payload, if this is a text datum
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coded payload, if this is a coded datum
    pub const fn as_coded(&self) -> Option<&Concept> {
        match self {
            Self::Coded(c) => Some(c),
            _ => None,
        }
    }

    /// Loose truthiness used when coercing a result to a boolean:
    /// booleans are themselves, numerics are non-zero, text is non-empty,
    /// dates and coded values are present and therefore true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Numeric(n) => !n.is_zero(),
            Self::Text(s) => !s.is_empty(),
            Self::Datetime(_) | Self::Coded(_) => true,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Coded(c) => write!(f, "{c}"),
            Self::Datetime(d) => write!(f, "{}", d.to_rfc3339()),
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Decimal> for DataValue {
    fn from(n: Decimal) -> Self {
        Self::Numeric(n)
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        Self::Numeric(Decimal::from(n))
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Datetime(d)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Concept> for DataValue {
    fn from(c: Concept) -> Self {
        Self::Coded(c)
    }
}

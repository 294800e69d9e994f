//! Operand values and operator compatibility

use crate::duration::Duration;
use crate::operator::Operator;
use chrono::{DateTime, Utc};
use octofhir_logic_types::Concept;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value on the right-hand side of a comparison.
///
/// Each variant declares which operators it legally supports; building an
/// expression with an unsupported pairing is a validation failure, never a
/// silent coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Free-text value
    Text(String),
    /// Numeric value
    Numeric(Decimal),
    /// Date/time value
    Date(DateTime<Utc>),
    /// Coded category reference
    Coded(Concept),
    /// Collection of operands, for membership tests
    Collection(Vec<Operand>),
    /// Relative time span, for windowed queries
    Duration(Duration),
}

impl Operand {
    /// Whether `operator` may legally be applied to this operand.
    ///
    /// This is the static compatibility table; it knows nothing about which
    /// fact source a comparison targets. Per-source legality is checked
    /// later, at translation time.
    pub const fn supports(&self, operator: Operator) -> bool {
        match self {
            Self::Text(_) => matches!(operator, Operator::Equal | Operator::Contains),
            Self::Numeric(_) => matches!(
                operator,
                Operator::Equal
                    | Operator::Less
                    | Operator::LessOrEqual
                    | Operator::Greater
                    | Operator::GreaterOrEqual
                    | Operator::Contains
            ),
            Self::Date(_) => matches!(
                operator,
                Operator::Before
                    | Operator::After
                    | Operator::AsOf
                    | Operator::Equal
                    | Operator::GreaterOrEqual
                    | Operator::LessOrEqual
            ),
            Self::Coded(_) => matches!(operator, Operator::Equal | Operator::Contains),
            Self::Collection(_) => matches!(operator, Operator::In),
            Self::Duration(_) => matches!(operator, Operator::Within),
        }
    }

    /// Lowercase datatype name used in messages
    pub const fn datatype_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Numeric(_) => "numeric",
            Self::Date(_) => "date",
            Self::Coded(_) => "coded",
            Self::Collection(_) => "collection",
            Self::Duration(_) => "duration",
        }
    }

    /// Date payload, if this is a date operand
    pub const fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Duration payload, if this is a duration operand
    pub const fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Numeric payload, if this is a numeric operand
    pub const fn as_numeric(&self) -> Option<Decimal> {
        match self {
            Self::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload, if this is a text operand
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coded payload, if this is a coded operand
    pub const fn as_coded(&self) -> Option<&Concept> {
        match self {
            Self::Coded(c) => Some(c),
            _ => None,
        }
    }

    /// Collection payload, if this is a collection operand
    pub fn as_collection(&self) -> Option<&[Operand]> {
        match self {
            Self::Collection(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "\"{s}\""),
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Self::Coded(c) => write!(f, "{c}"),
            Self::Collection(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Duration(d) => write!(f, "{d}"),
        }
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Decimal> for Operand {
    fn from(n: Decimal) -> Self {
        Self::Numeric(n)
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Self::Numeric(Decimal::from(n))
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Concept> for Operand {
    fn from(c: Concept) -> Self {
        Self::Coded(c)
    }
}

impl From<Duration> for Operand {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Self::Collection(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Operand::from(200i64), Operator::Less, true)]
    #[case(Operand::from(200i64), Operator::Before, false)]
    #[case(Operand::from("M"), Operator::Equal, true)]
    #[case(Operand::from("M"), Operator::Greater, false)]
    #[case(Operand::from(vec![1i64, 2]), Operator::In, true)]
    #[case(Operand::from(vec![1i64, 2]), Operator::Equal, false)]
    #[case(Operand::from(Duration::days(-30)), Operator::Within, true)]
    #[case(Operand::from(Duration::days(-30)), Operator::Less, false)]
    fn test_compatibility_table(
        #[case] operand: Operand,
        #[case] operator: Operator,
        #[case] legal: bool,
    ) {
        assert_eq!(operand.supports(operator), legal);
    }

    #[test]
    fn test_date_supports_bounds_but_not_strict_less() {
        let d = Operand::Date(Utc::now());
        assert!(d.supports(Operator::Before));
        assert!(d.supports(Operator::LessOrEqual));
        assert!(!d.supports(Operator::Less));
    }

    #[test]
    fn test_display_names_values() {
        assert_eq!(Operand::from("Clinic A").to_string(), "\"Clinic A\"");
        assert_eq!(Operand::from(vec![1i64, 2]).to_string(), "(1, 2)");
        assert_eq!(Operand::from(200i64).datatype_name(), "numeric");
    }
}

//! Lowering expression trees into backend predicates
//!
//! The translator walks one expression tree for one fact source and produces
//! a single composable [`Criterion`], or none when the expression imposes no
//! restriction. Token resolution and operator legality are delegated to the
//! source's [`FieldMap`]; temporal operators thread a mutable reference date
//! through the walk, so an "as of" override is visible to every sibling and
//! child translated within the same call.
//!
//! Existence operators are deliberately never lowered here. They stay
//! attached to the criteria as a transform and are decided after fetch by
//! coercing the result to a boolean.

use crate::criterion::{CompareOp, Criterion, FieldRef};
use chrono::{DateTime, Utc};
use octofhir_logic_ast::{CompareExpr, Expression, ExpressionKind, Operand, Operator};
use octofhir_logic_diagnostics::{LogicError, LogicResult};
use octofhir_logic_types::{Concept, DataValue};

/// What a token resolves to on one fact source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// The source's own records; comparisons bind to the value field
    Primary,
    /// A coded category; restricts the category field and binds
    /// comparisons to the value field
    Category(Concept),
    /// A named structural attribute of the record
    Attribute(String),
}

/// Per-source token resolution and operator legality.
///
/// Each fact source carries its own alias map: a token may be the source's
/// primary key, a structural attribute, or a coded category resolved by
/// name. An operator legal for its operand type can still be meaningless
/// for a given source; `allows` rejects those pairings hard instead of
/// silently ignoring them.
pub trait FieldMap {
    /// Source name used in error messages
    fn source_name(&self) -> &str;

    /// Resolve a token, if this source knows it
    fn resolve(&self, token: &str) -> Option<FieldTarget>;

    /// Whether `op` is meaningful against `target` on this source
    fn allows(&self, op: Operator, target: &FieldTarget) -> bool;
}

/// Recursive-descent translation of one expression tree for one source
pub struct Translator<'a> {
    fields: &'a dyn FieldMap,
    reference_date: DateTime<Utc>,
}

impl<'a> Translator<'a> {
    /// A translator for `fields`, anchored at `reference_date`
    pub fn new(fields: &'a dyn FieldMap, reference_date: DateTime<Utc>) -> Self {
        Self {
            fields,
            reference_date,
        }
    }

    /// The reference date after any "as of" overrides seen so far
    pub const fn reference_date(&self) -> DateTime<Utc> {
        self.reference_date
    }

    /// Translate a whole expression tree into a predicate, or `None` when
    /// the expression imposes no restriction on this source.
    pub fn translate(&mut self, expression: &Expression) -> LogicResult<Option<Criterion>> {
        self.node(expression)
    }

    fn node(&mut self, expression: &Expression) -> LogicResult<Option<Criterion>> {
        match &expression.kind {
            ExpressionKind::Token(name) => self.token(name),
            ExpressionKind::Not(child) => Ok(self.node(child)?.map(Criterion::negate)),
            ExpressionKind::Compare(node) => self.compare(node),
            ExpressionKind::Compose(node) => {
                let left = self.node(&node.left)?;
                let right = self.node(&node.right)?;
                match node.op {
                    Operator::And => Ok(Criterion::conjoin(left, right)),
                    Operator::Or => Ok(Criterion::disjoin(left, right)),
                    other => Err(LogicError::malformed(format!(
                        "operator {other} cannot compose sub-expressions"
                    ))),
                }
            }
        }
    }

    fn token(&mut self, name: &str) -> LogicResult<Option<Criterion>> {
        match self.resolve_target(name)? {
            FieldTarget::Category(concept) => Ok(Some(Criterion::Compare {
                field: FieldRef::Category,
                op: CompareOp::Eq,
                value: DataValue::Coded(concept),
            })),
            FieldTarget::Primary | FieldTarget::Attribute(_) => Ok(None),
        }
    }

    fn compare(&mut self, node: &CompareExpr) -> LogicResult<Option<Criterion>> {
        let token = node.left.root_token().ok_or_else(|| {
            LogicError::malformed(format!("comparison {} has no left-hand token", node.op))
        })?;
        let target = self.resolve_target(token)?;
        if !self.fields.allows(node.op, &target) {
            return Err(LogicError::unsupported_operator(
                node.op.symbol(),
                format!("{token} on {}", self.fields.source_name()),
                format!("{} ({})", node.operand, node.operand.datatype_name()),
            ));
        }

        match node.op {
            Operator::AsOf => {
                // The override must be in place before the left subtree is
                // descended, so nested windows anchor on the new date.
                let date = date_operand(node.op, &node.operand)?;
                self.reference_date = date;
                let left = self.node(&node.left)?;
                let bound = Criterion::Compare {
                    field: FieldRef::Effective,
                    op: CompareOp::Lte,
                    value: DataValue::Datetime(date),
                };
                Ok(Criterion::conjoin(left, Some(bound)))
            }
            Operator::Within => {
                // Descend first: an "as of" inside the left subtree moves
                // the anchor this window is computed from.
                let left = self.node(&node.left)?;
                let duration = node.operand.as_duration().ok_or_else(|| {
                    LogicError::malformed(format!(
                        "within requires a duration operand, got {}",
                        node.operand.datatype_name()
                    ))
                })?;
                let far = duration.offset_from(self.reference_date);
                let (low, high) = if far < self.reference_date {
                    (far, self.reference_date)
                } else {
                    (self.reference_date, far)
                };
                let window = Criterion::Between {
                    field: FieldRef::Effective,
                    low,
                    high,
                };
                Ok(Criterion::conjoin(left, Some(window)))
            }
            Operator::Before => {
                let date = date_operand(node.op, &node.operand)?;
                let left = self.node(&node.left)?;
                let bound = Criterion::Compare {
                    field: FieldRef::Effective,
                    op: CompareOp::Lt,
                    value: DataValue::Datetime(date),
                };
                Ok(Criterion::conjoin(left, Some(bound)))
            }
            Operator::After => {
                let date = date_operand(node.op, &node.operand)?;
                let left = self.node(&node.left)?;
                let bound = Criterion::Compare {
                    field: FieldRef::Effective,
                    op: CompareOp::Gt,
                    value: DataValue::Datetime(date),
                };
                Ok(Criterion::conjoin(left, Some(bound)))
            }
            Operator::Equal
            | Operator::Less
            | Operator::LessOrEqual
            | Operator::Greater
            | Operator::GreaterOrEqual => {
                let left = self.node(&node.left)?;
                let comparison = Criterion::Compare {
                    field: value_field(&target, &node.operand),
                    op: compare_op(node.op),
                    value: scalar_value(&node.operand)?,
                };
                Ok(Criterion::conjoin(left, Some(comparison)))
            }
            Operator::Contains => {
                let left = self.node(&node.left)?;
                let contains = Criterion::Contains {
                    field: value_field(&target, &node.operand),
                    value: scalar_value(&node.operand)?,
                };
                Ok(Criterion::conjoin(left, Some(contains)))
            }
            Operator::In => {
                let items = node.operand.as_collection().ok_or_else(|| {
                    LogicError::malformed(format!(
                        "in requires a collection operand, got {}",
                        node.operand.datatype_name()
                    ))
                })?;
                let values = items
                    .iter()
                    .map(scalar_value)
                    .collect::<LogicResult<Vec<_>>>()?;
                let left = self.node(&node.left)?;
                let membership = Criterion::In {
                    field: value_field(&target, &node.operand),
                    values,
                };
                Ok(Criterion::conjoin(left, Some(membership)))
            }
            other => Err(LogicError::malformed(format!(
                "operator {other} is not a comparison"
            ))),
        }
    }

    fn resolve_target(&self, token: &str) -> LogicResult<FieldTarget> {
        self.fields
            .resolve(token)
            .ok_or_else(|| LogicError::unknown_token(token, self.fields.source_name()))
    }
}

/// Field a comparison binds to: date operands always bound the effective
/// date; everything else binds the value field, or the attribute the token
/// resolved to.
fn value_field(target: &FieldTarget, operand: &Operand) -> FieldRef {
    if operand.as_date().is_some() {
        return FieldRef::Effective;
    }
    match target {
        FieldTarget::Primary | FieldTarget::Category(_) => FieldRef::Value,
        FieldTarget::Attribute(name) => FieldRef::Attribute(name.clone()),
    }
}

const fn compare_op(op: Operator) -> CompareOp {
    match op {
        Operator::Less => CompareOp::Lt,
        Operator::LessOrEqual => CompareOp::Lte,
        Operator::Greater => CompareOp::Gt,
        Operator::GreaterOrEqual => CompareOp::Gte,
        _ => CompareOp::Eq,
    }
}

fn date_operand(op: Operator, operand: &Operand) -> LogicResult<DateTime<Utc>> {
    operand.as_date().ok_or_else(|| {
        LogicError::malformed(format!(
            "{op} requires a date operand, got {}",
            operand.datatype_name()
        ))
    })
}

fn scalar_value(operand: &Operand) -> LogicResult<DataValue> {
    match operand {
        Operand::Text(s) => Ok(DataValue::Text(s.clone())),
        Operand::Numeric(n) => Ok(DataValue::Numeric(*n)),
        Operand::Date(d) => Ok(DataValue::Datetime(*d)),
        Operand::Coded(c) => Ok(DataValue::Coded(c.clone())),
        Operand::Collection(_) | Operand::Duration(_) => Err(LogicError::malformed(format!(
            "{} operand cannot be compared as a value",
            operand.datatype_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use octofhir_logic_ast::{Criteria, Duration};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn cd4() -> Concept {
        Concept::new(5497, "CD4 COUNT")
    }

    struct ObservationFields;

    impl FieldMap for ObservationFields {
        fn source_name(&self) -> &str {
            "observation"
        }

        fn resolve(&self, token: &str) -> Option<FieldTarget> {
            match token {
                "CD4 COUNT" => Some(FieldTarget::Category(cd4())),
                "WEIGHT" => Some(FieldTarget::Category(Concept::new(5089, "WEIGHT"))),
                _ => None,
            }
        }

        fn allows(&self, _op: Operator, _target: &FieldTarget) -> bool {
            true
        }
    }

    struct EncounterFields;

    impl FieldMap for EncounterFields {
        fn source_name(&self) -> &str {
            "encounter"
        }

        fn resolve(&self, token: &str) -> Option<FieldTarget> {
            match token {
                "ENCOUNTER" => Some(FieldTarget::Primary),
                "LOCATION" => Some(FieldTarget::Attribute("location".to_string())),
                _ => None,
            }
        }

        fn allows(&self, op: Operator, target: &FieldTarget) -> bool {
            match target {
                FieldTarget::Attribute(_) => {
                    matches!(op, Operator::Equal | Operator::Contains | Operator::In)
                }
                _ => true,
            }
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap()
    }

    fn translate_obs(criteria: &Criteria, reference: DateTime<Utc>) -> Option<Criterion> {
        let mut translator = Translator::new(&ObservationFields, reference);
        translator.translate(criteria.expression()).unwrap()
    }

    fn category_eq() -> Criterion {
        Criterion::Compare {
            field: FieldRef::Category,
            op: CompareOp::Eq,
            value: DataValue::Coded(cd4()),
        }
    }

    fn value_lt(n: i64) -> Criterion {
        Criterion::Compare {
            field: FieldRef::Value,
            op: CompareOp::Lt,
            value: DataValue::Numeric(Decimal::from(n)),
        }
    }

    #[test]
    fn test_bare_category_token_restricts_category() {
        let criteria = Criteria::token("CD4 COUNT");
        assert_eq!(translate_obs(&criteria, day(15)), Some(category_eq()));
    }

    #[test]
    fn test_unknown_token_is_distinct_error() {
        let mut translator = Translator::new(&ObservationFields, day(15));
        let err = translator
            .translate(Criteria::token("PROVIDER").expression())
            .unwrap_err();
        assert_eq!(err, LogicError::unknown_token("PROVIDER", "observation"));
    }

    #[test]
    fn test_comparison_and_date_bound_conjoin() {
        let criteria = Criteria::token("CD4 COUNT").lt(200).unwrap().before(day(10));
        let expected = category_eq().and(value_lt(200)).and(Criterion::Compare {
            field: FieldRef::Effective,
            op: CompareOp::Lt,
            value: DataValue::Datetime(day(10)),
        });
        assert_eq!(translate_obs(&criteria, day(15)), Some(expected));
    }

    #[test]
    fn test_date_operand_bounds_effective_inclusively() {
        let criteria = Criteria::token("CD4 COUNT").lte(day(10)).unwrap();
        let expected = category_eq().and(Criterion::Compare {
            field: FieldRef::Effective,
            op: CompareOp::Lte,
            value: DataValue::Datetime(day(10)),
        });
        assert_eq!(translate_obs(&criteria, day(15)), Some(expected));
    }

    #[test]
    fn test_as_of_rebases_nested_window() {
        let criteria = Criteria::token("CD4 COUNT")
            .as_of(day(20))
            .within(Duration::days(-10));
        let expected = category_eq()
            .and(Criterion::Compare {
                field: FieldRef::Effective,
                op: CompareOp::Lte,
                value: DataValue::Datetime(day(20)),
            })
            .and(Criterion::Between {
                field: FieldRef::Effective,
                low: day(10),
                high: day(20),
            });
        // index date is day 5; the explicit as-of must win as the anchor
        assert_eq!(translate_obs(&criteria, day(5)), Some(expected));
    }

    #[test]
    fn test_within_normalizes_window_direction() {
        let past = Criteria::token("CD4 COUNT").within(Duration::days(-10));
        let expected_past = category_eq().and(Criterion::Between {
            field: FieldRef::Effective,
            low: day(5),
            high: day(15),
        });
        assert_eq!(translate_obs(&past, day(15)), Some(expected_past));

        let future = Criteria::token("CD4 COUNT").within(Duration::days(10));
        let expected_future = category_eq().and(Criterion::Between {
            field: FieldRef::Effective,
            low: day(15),
            high: day(25),
        });
        assert_eq!(translate_obs(&future, day(15)), Some(expected_future));
    }

    #[test]
    fn test_or_combines_both_branches() {
        let criteria = Criteria::token("CD4 COUNT")
            .lt(200)
            .unwrap()
            .or(Criteria::token("WEIGHT").lt(40).unwrap());
        let left = category_eq().and(value_lt(200));
        let right = Criterion::Compare {
            field: FieldRef::Category,
            op: CompareOp::Eq,
            value: DataValue::Coded(Concept::new(5089, "WEIGHT")),
        }
        .and(value_lt(40));
        assert_eq!(translate_obs(&criteria, day(15)), Some(left.or(right)));
    }

    #[test]
    fn test_negation_wraps_translated_child() {
        let criteria = Criteria::token("CD4 COUNT").negate().negate();
        assert_eq!(
            translate_obs(&criteria, day(15)),
            Some(category_eq().negate().negate())
        );
    }

    #[test]
    fn test_source_legality_rejects_attribute_ordering() {
        let criteria = Criteria::token("LOCATION").gt(5).unwrap();
        let mut translator = Translator::new(&EncounterFields, day(15));
        let err = translator.translate(criteria.expression()).unwrap_err();
        match err {
            LogicError::UnsupportedOperator { operator, left, .. } => {
                assert_eq!(operator, ">");
                assert_eq!(left, "LOCATION on encounter");
            }
            other => panic!("expected unsupported-operator error, got {other:?}"),
        }
    }

    #[test]
    fn test_primary_token_imposes_no_restriction() {
        let criteria = Criteria::token("ENCOUNTER");
        let mut translator = Translator::new(&EncounterFields, day(15));
        assert_eq!(translator.translate(criteria.expression()).unwrap(), None);
    }

    #[test]
    fn test_attribute_comparison_binds_attribute_field() {
        let criteria = Criteria::token("LOCATION").equal_to("Clinic A").unwrap();
        let mut translator = Translator::new(&EncounterFields, day(15));
        let expected = Criterion::Compare {
            field: FieldRef::Attribute("location".to_string()),
            op: CompareOp::Eq,
            value: DataValue::Text("Clinic A".to_string()),
        };
        assert_eq!(
            translator.translate(criteria.expression()).unwrap(),
            Some(expected)
        );
    }
}

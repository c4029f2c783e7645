use crate::diagnostics::DiagnosticSink;
use regflux_schemas::constraint::Constraint;
use regflux_schemas::rule::{AggregationPolicy, ComparisonOperator, Condition};
use std::collections::{BTreeSet, HashMap};

/// The continuous state a condition is evaluated against: each entity's
/// current value, represented as a one-entity constraint (a degenerate
/// window for a solved flux, a level's bound window for a regulated entity).
pub type ValueSnapshot = HashMap<String, Constraint>;

/// Whether the condition holds against the snapshot.
///
/// An entity missing from the snapshot makes its threshold condition
/// false; unknown data degrades to "rule does not fire", never an error.
pub fn is_true(condition: &Condition, values: &ValueSnapshot) -> bool {
    match condition {
        Condition::Threshold {
            entity_id,
            operator,
            threshold,
            ..
        } => values
            .get(entity_id)
            .map(|c| operator.compare(c.representative_value(), *threshold))
            .unwrap_or(false),
        Condition::AllOf { conditions } => conditions.iter().all(|c| is_true(c, values)),
        Condition::AnyOf { conditions } => conditions.iter().any(|c| is_true(c, values)),
        Condition::Undetermined => false,
    }
}

/// The sensitivity variant of [`is_true`].
///
/// Deliberately NOT a logical complement: a disjunction is inverse-true
/// only when ALL children are inverse-true, a conjunction when ANY child
/// is. Downstream sensitivity probing depends on this exact asymmetry.
pub fn is_inverse_true(condition: &Condition, values: &ValueSnapshot) -> bool {
    match condition {
        Condition::Threshold {
            entity_id,
            operator,
            threshold,
            ..
        } => values
            .get(entity_id)
            .map(|c| !operator.compare(c.representative_value(), *threshold))
            .unwrap_or(false),
        Condition::AllOf { conditions } => {
            conditions.iter().any(|c| is_inverse_true(c, values))
        }
        Condition::AnyOf { conditions } => {
            conditions.iter().all(|c| is_inverse_true(c, values))
        }
        Condition::Undetermined => false,
    }
}

/// All entity ids the condition references, transitively.
pub fn involved_entities(condition: &Condition) -> BTreeSet<String> {
    let mut entities = BTreeSet::new();
    collect_entities(condition, &mut entities);
    entities
}

fn collect_entities(condition: &Condition, out: &mut BTreeSet<String>) {
    match condition {
        Condition::Threshold { entity_id, .. } => {
            out.insert(entity_id.clone());
        }
        Condition::AllOf { conditions } | Condition::AnyOf { conditions } => {
            for c in conditions {
                collect_entities(c, out);
            }
        }
        Condition::Undetermined => {}
    }
}

/// Aggregates omics-like sample values over the condition's structure.
///
/// A threshold condition reads its entity's sample (NaN when absent).
/// Composites aggregate their children uniformly per policy: `Mean`
/// averages the non-NaN children, `Minimum` takes their minimum; a
/// composite whose children are all NaN is NaN.
pub fn quantitative_value(
    condition: &Condition,
    samples: &HashMap<String, f64>,
    policy: AggregationPolicy,
) -> f64 {
    match condition {
        Condition::Threshold { entity_id, .. } => {
            samples.get(entity_id).copied().unwrap_or(f64::NAN)
        }
        Condition::AllOf { conditions } | Condition::AnyOf { conditions } => aggregate(
            conditions
                .iter()
                .map(|c| quantitative_value(c, samples, policy)),
            policy,
        ),
        Condition::Undetermined => f64::NAN,
    }
}

fn aggregate(values: impl Iterator<Item = f64>, policy: AggregationPolicy) -> f64 {
    let contributing: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
    if contributing.is_empty() {
        return f64::NAN;
    }
    match policy {
        AggregationPolicy::Mean => {
            contributing.iter().sum::<f64>() / contributing.len() as f64
        }
        AggregationPolicy::Minimum => contributing
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min),
    }
}

/// Translates the condition into linear bound constraints, when a
/// lossless encoding exists.
///
/// Threshold conditions become one-entity bounds (strict comparisons use
/// the closed bound, since LP bounds are closed); a conjunction of
/// translatable children concatenates their constraints. Disjunctions,
/// `not_equal_to`, and undetermined conditions have no linear encoding:
/// they yield an empty set, and all but the intentionally-disabled
/// undetermined case emit one warning. Callers must treat an empty
/// result as "unsupported, skip this rule's effect".
pub fn to_constraints(condition: &Condition, sink: &dyn DiagnosticSink) -> Vec<Constraint> {
    match linear_encoding(condition) {
        Some(constraints) => constraints,
        None => {
            if !matches!(condition, Condition::Undetermined) {
                sink.warn(&format!(
                    "condition has no linear constraint encoding; rule effect skipped \
                     (entities: {:?})",
                    involved_entities(condition)
                ));
            }
            Vec::new()
        }
    }
}

fn linear_encoding(condition: &Condition) -> Option<Vec<Constraint>> {
    match condition {
        Condition::Threshold {
            entity_id,
            operator,
            threshold,
            ..
        } => match operator {
            ComparisonOperator::GreaterEq | ComparisonOperator::GreaterThan => {
                Some(vec![Constraint::at_least(entity_id, *threshold)])
            }
            ComparisonOperator::LessEq | ComparisonOperator::LessThan => {
                Some(vec![Constraint::at_most(entity_id, *threshold)])
            }
            ComparisonOperator::EqualTo => Some(vec![Constraint::fixed(entity_id, *threshold)]),
            ComparisonOperator::NotEqualTo => None,
        },
        Condition::AllOf { conditions } => {
            let mut all = Vec::new();
            for c in conditions {
                all.extend(linear_encoding(c)?);
            }
            Some(all)
        }
        Condition::AnyOf { .. } => None,
        Condition::Undetermined => None,
    }
}

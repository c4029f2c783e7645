use crate::entity::EntityKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    LessThan,
    LessEq,
    GreaterThan,
    GreaterEq,
    EqualTo,
    NotEqualTo,
}

impl ComparisonOperator {
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::LessThan => value < threshold,
            ComparisonOperator::LessEq => value <= threshold,
            ComparisonOperator::GreaterThan => value > threshold,
            ComparisonOperator::GreaterEq => value >= threshold,
            ComparisonOperator::EqualTo => (value - threshold).abs() < f64::EPSILON,
            ComparisonOperator::NotEqualTo => (value - threshold).abs() >= f64::EPSILON,
        }
    }
}

/// A boolean predicate over discretized entity states.
///
/// `Threshold` compares one entity's current continuous value against a
/// numeric threshold. `AllOf`/`AnyOf` compose sub-conditions. An
/// `Undetermined` condition never fires; it marks a rule intentionally
/// disabled pending more information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Threshold {
        entity_id: String,
        operator: ComparisonOperator,
        threshold: f64,
        /// Tie-break priority among simultaneously-true threshold rules.
        /// Carried for time-dependent evaluation by external schedulers;
        /// higher wins.
        #[serde(default)]
        priority: i32,
    },
    AllOf {
        conditions: Vec<Condition>,
    },
    AnyOf {
        conditions: Vec<Condition>,
    },
    Undetermined,
}

/// A named regulatory rule: "if `condition` holds, the entity transitions
/// to `target_level`". A `None` condition marks the default rule used
/// when no conditional rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub name: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    pub target_level: u32,
    #[serde(default)]
    pub start: Option<u64>,
    #[serde(default)]
    pub duration: Option<u64>,
}

/// Aggregation policy for `quantitative_value` over omics-like sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    Mean,
    Minimum,
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(AggregationPolicy::Mean),
            "minimum" => Ok(AggregationPolicy::Minimum),
            other => Err(format!(
                "unknown aggregation policy '{}' (expected 'mean' or 'minimum')",
                other
            )),
        }
    }
}

/// One regulated entity as declared in a regulation file: its discrete
/// level count, initial level, per-level bound windows, and transition
/// rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatedEntityDef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: EntityKind,
    pub levels: u32,
    pub initial_level: u32,
    pub level_bounds: Vec<LevelBound>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    pub default: Interaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelBound {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

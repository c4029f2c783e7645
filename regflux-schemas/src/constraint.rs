use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A linear inequality `lb <= sum(coefficient_i * entity_i) <= ub`.
///
/// Used both as a metabolic flux bound and as the continuous encoding of
/// a discrete regulatory state. Value object: copies of a constraint are
/// handed to the optimizer, never shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub coefficients: BTreeMap<String, f64>,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Constraint {
    pub fn bound(entity_id: &str, lower_bound: f64, upper_bound: f64) -> Self {
        let mut coefficients = BTreeMap::new();
        coefficients.insert(entity_id.to_string(), 1.0);
        Constraint {
            coefficients,
            lower_bound,
            upper_bound,
        }
    }

    pub fn fixed(entity_id: &str, value: f64) -> Self {
        Self::bound(entity_id, value, value)
    }

    pub fn at_least(entity_id: &str, threshold: f64) -> Self {
        Self::bound(entity_id, threshold, f64::INFINITY)
    }

    pub fn at_most(entity_id: &str, threshold: f64) -> Self {
        Self::bound(entity_id, f64::NEG_INFINITY, threshold)
    }

    /// The single (entity id, coefficient) pair, if this constraint
    /// involves exactly one entity.
    pub fn single_entity(&self) -> Option<(&str, f64)> {
        if self.coefficients.len() == 1 {
            self.coefficients
                .iter()
                .next()
                .map(|(id, coefficient)| (id.as_str(), *coefficient))
        } else {
            None
        }
    }

    /// A scalar standing in for this constraint when a condition asks
    /// "what is the entity's current value": the lower bound when finite,
    /// else the upper bound when finite, else 0.
    pub fn representative_value(&self) -> f64 {
        if self.lower_bound.is_finite() {
            self.lower_bound
        } else if self.upper_bound.is_finite() {
            self.upper_bound
        } else {
            0.0
        }
    }

    /// Midpoint of the bound window, defined only when both bounds are finite.
    pub fn midpoint(&self) -> Option<f64> {
        if self.lower_bound.is_finite() && self.upper_bound.is_finite() {
            Some((self.lower_bound + self.upper_bound) / 2.0)
        } else {
            None
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound && value <= self.upper_bound
    }

    pub fn bounds_equal(&self, other: &Constraint) -> bool {
        self.lower_bound == other.lower_bound && self.upper_bound == other.upper_bound
    }
}

/// One row of a constraints file: a bound window for a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBound {
    pub entity_id: String,
    #[serde(default = "neg_infinity")]
    pub lower_bound: f64,
    #[serde(default = "infinity")]
    pub upper_bound: f64,
}

impl EntityBound {
    pub fn to_constraint(&self) -> Constraint {
        Constraint::bound(&self.entity_id, self.lower_bound, self.upper_bound)
    }
}

fn neg_infinity() -> f64 {
    f64::NEG_INFINITY
}

fn infinity() -> f64 {
    f64::INFINITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representative_value_prefers_the_finite_lower_bound() {
        assert_eq!(Constraint::bound("x", 2.0, 8.0).representative_value(), 2.0);
        assert_eq!(Constraint::at_most("x", 8.0).representative_value(), 8.0);
        assert_eq!(
            Constraint::bound("x", f64::NEG_INFINITY, f64::INFINITY).representative_value(),
            0.0
        );
    }

    #[test]
    fn midpoint_needs_both_bounds_finite() {
        assert_eq!(Constraint::bound("x", 2.0, 8.0).midpoint(), Some(5.0));
        assert_eq!(Constraint::at_least("x", 2.0).midpoint(), None);
    }

    #[test]
    fn single_entity_only_for_one_coefficient() {
        let single = Constraint::fixed("x", 1.0);
        assert_eq!(single.single_entity(), Some(("x", 1.0)));

        let mut coefficients = BTreeMap::new();
        coefficients.insert("x".to_string(), 1.0);
        coefficients.insert("y".to_string(), -1.0);
        let coupled = Constraint {
            coefficients,
            lower_bound: 0.0,
            upper_bound: 0.0,
        };
        assert_eq!(coupled.single_entity(), None);
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reaction in the structural metabolic model: metabolite stoichiometry
/// plus the flux bound window the optimizer starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stoichiometry: BTreeMap<String, f64>,
    #[serde(default = "default_lower_bound")]
    pub lower_bound: f64,
    #[serde(default = "default_upper_bound")]
    pub upper_bound: f64,
    #[serde(default)]
    pub objective_coefficient: f64,
    #[serde(default)]
    pub annotation: Option<serde_json::Value>,
}

fn default_lower_bound() -> f64 {
    -1000.0
}

fn default_upper_bound() -> f64 {
    1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetabolicNetwork {
    pub id: String,
    pub reactions: Vec<Reaction>,
}

impl MetabolicNetwork {
    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.id == id)
    }

    /// Reaction id -> objective coefficient, for every reaction with a
    /// nonzero coefficient.
    pub fn objective(&self) -> BTreeMap<String, f64> {
        self.reactions
            .iter()
            .filter(|r| r.objective_coefficient != 0.0)
            .map(|r| (r.id.clone(), r.objective_coefficient))
            .collect()
    }
}

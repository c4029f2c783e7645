use crate::error::RegfluxError;
use crate::regulation::eval::{self, ValueSnapshot};
use regflux_schemas::rule::Interaction;
use std::collections::BTreeSet;

/// Per-entity transition rule set: an ordered list of conditional
/// interactions plus exactly one default used when none of them fire.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionFunction {
    conditional: Vec<Interaction>,
    default: Interaction,
}

impl TransitionFunction {
    pub fn new(
        conditional: Vec<Interaction>,
        default: Interaction,
    ) -> Result<Self, RegfluxError> {
        if default.condition.is_some() {
            return Err(RegfluxError::DefaultHasCondition(default.name));
        }
        for interaction in &conditional {
            if interaction.condition.is_none() {
                return Err(RegfluxError::MissingCondition(interaction.name.clone()));
            }
        }
        Ok(Self {
            conditional,
            default,
        })
    }

    /// Splits a mixed rule list into conditionals (declared order kept)
    /// and the single condition-less default.
    pub fn from_interactions(
        entity_id: &str,
        interactions: Vec<Interaction>,
    ) -> Result<Self, RegfluxError> {
        let mut conditional = Vec::new();
        let mut default = None;
        for interaction in interactions {
            if interaction.condition.is_some() {
                conditional.push(interaction);
            } else if default.is_none() {
                default = Some(interaction);
            } else {
                return Err(RegfluxError::MultipleDefaultInteractions(
                    entity_id.to_string(),
                ));
            }
        }
        let default = default
            .ok_or_else(|| RegfluxError::MissingDefaultInteraction(entity_id.to_string()))?;
        Self::new(conditional, default)
    }

    /// The next discrete level for the current snapshot: the first
    /// conditional interaction (declared order) whose condition holds
    /// wins; otherwise the default's target level. Pure function of the
    /// snapshot, no hidden history.
    pub fn next_level(&self, values: &ValueSnapshot) -> u32 {
        for interaction in &self.conditional {
            if let Some(condition) = &interaction.condition {
                if eval::is_true(condition, values) {
                    return interaction.target_level;
                }
            }
        }
        self.default.target_level
    }

    /// Every conditional interaction currently true, in declared order.
    /// External time-stepping collaborators use this together with the
    /// threshold priority field for tie-breaking; this core does not.
    pub fn firing_interactions(&self, values: &ValueSnapshot) -> Vec<&Interaction> {
        self.conditional
            .iter()
            .filter(|i| {
                i.condition
                    .as_ref()
                    .map(|c| eval::is_true(c, values))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn conditional(&self) -> &[Interaction] {
        &self.conditional
    }

    pub fn default_interaction(&self) -> &Interaction {
        &self.default
    }

    /// Union of all entity ids referenced by the conditional rules.
    pub fn involved_entities(&self) -> BTreeSet<String> {
        let mut entities = BTreeSet::new();
        for interaction in &self.conditional {
            if let Some(condition) = &interaction.condition {
                entities.extend(eval::involved_entities(condition));
            }
        }
        entities
    }
}

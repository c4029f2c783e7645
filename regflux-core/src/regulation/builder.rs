use crate::{
    error::RegfluxError,
    regulation::{
        network::{InteractionNetwork, RegulatedEntity},
        transition::TransitionFunction,
        translation::TranslationTable,
    },
};
use regflux_schemas::{
    constraint::Constraint,
    entity::Entity,
    rule::{LevelBound, RegulatedEntityDef},
};
use std::collections::BTreeMap;

/// A fluent builder for constructing an `InteractionNetwork`.
///
/// Collects regulated-entity definitions (and optional per-entity
/// level-bound overrides) and validates the whole configuration at
/// `build` time: level counts, bound sanity, transition-function shape,
/// and that every translation entry names an owned entity.
#[derive(Default)]
pub struct NetworkBuilder {
    definitions: Vec<RegulatedEntityDef>,
    bound_overrides: Vec<(String, Vec<LevelBound>)>,
}

impl NetworkBuilder {
    /// Creates a new, empty `NetworkBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the regulated-entity definitions to build from.
    pub fn with_entities(mut self, definitions: Vec<RegulatedEntityDef>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Adds one regulated-entity definition.
    pub fn with_entity(mut self, definition: RegulatedEntityDef) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Replaces the level bounds for one entity (e.g. from a separate
    /// constraints source). The entity must be among the definitions;
    /// an unknown id is a fatal configuration error at `build`.
    pub fn with_level_bounds(mut self, entity_id: &str, bounds: Vec<LevelBound>) -> Self {
        self.bound_overrides.push((entity_id.to_string(), bounds));
        self
    }

    /// Consumes the builder and returns a validated `InteractionNetwork`.
    ///
    /// # Errors
    ///
    /// Returns a `RegfluxError` when a definition is internally
    /// inconsistent (level bound count, initial level range, inverted
    /// bounds, malformed transition rules) or when a bound override
    /// references an entity not present among the definitions.
    pub fn build(mut self) -> Result<InteractionNetwork, RegfluxError> {
        for (entity_id, bounds) in std::mem::take(&mut self.bound_overrides) {
            let def = self
                .definitions
                .iter_mut()
                .find(|d| d.id == entity_id)
                .ok_or_else(|| RegfluxError::UnknownEntity(entity_id.clone()))?;
            def.level_bounds = bounds;
        }

        let mut entities = BTreeMap::new();
        let mut translation = TranslationTable::new();

        for def in self.definitions {
            if def.level_bounds.len() != def.levels as usize {
                return Err(RegfluxError::LevelBoundCount {
                    entity: def.id,
                    expected: def.levels,
                    found: def.level_bounds.len(),
                });
            }
            if def.initial_level >= def.levels {
                return Err(RegfluxError::LevelOutOfRange {
                    entity: def.id,
                    level: def.initial_level,
                    levels: def.levels,
                });
            }

            let mut bounds = Vec::with_capacity(def.level_bounds.len());
            for level_bound in &def.level_bounds {
                if level_bound.lower_bound > level_bound.upper_bound {
                    return Err(RegfluxError::InvalidBound {
                        entity: def.id,
                        lower: level_bound.lower_bound,
                        upper: level_bound.upper_bound,
                    });
                }
                bounds.push(Constraint::bound(
                    &def.id,
                    level_bound.lower_bound,
                    level_bound.upper_bound,
                ));
            }

            let transition = TransitionFunction::new(def.interactions, def.default)?;
            let entity = Entity {
                id: def.id.clone(),
                name: def.name,
                kind: def.kind,
            };

            translation.insert(&def.id, bounds);
            entities.insert(
                def.id.clone(),
                RegulatedEntity {
                    entity,
                    levels: def.levels,
                    initial_level: def.initial_level,
                    transition,
                },
            );
        }

        Ok(InteractionNetwork::from_parts(entities, translation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regflux_schemas::entity::EntityKind;
    use regflux_schemas::rule::{ComparisonOperator, Condition, Interaction};

    fn two_level_def(id: &str) -> RegulatedEntityDef {
        RegulatedEntityDef {
            id: id.to_string(),
            name: None,
            kind: EntityKind::Gene,
            levels: 2,
            initial_level: 0,
            level_bounds: vec![
                LevelBound {
                    lower_bound: 0.0,
                    upper_bound: 0.0,
                },
                LevelBound {
                    lower_bound: 1.0,
                    upper_bound: 10.0,
                },
            ],
            interactions: vec![Interaction {
                name: format!("{}_on", id),
                condition: Some(Condition::Threshold {
                    entity_id: "signal".to_string(),
                    operator: ComparisonOperator::GreaterEq,
                    threshold: 1.0,
                    priority: 0,
                }),
                target_level: 1,
                start: None,
                duration: None,
            }],
            default: Interaction {
                name: format!("{}_off", id),
                condition: None,
                target_level: 0,
                start: None,
                duration: None,
            },
        }
    }

    #[test]
    fn builds_a_network_with_initial_state_and_translation() {
        let network = NetworkBuilder::new()
            .with_entity(two_level_def("gene_a"))
            .build()
            .unwrap();
        assert!(network.contains("gene_a"));
        assert_eq!(network.initial_state().level("gene_a"), Some(0));
        let c = network.constraint_from_state("gene_a", 1).unwrap();
        assert_eq!((c.lower_bound, c.upper_bound), (1.0, 10.0));
    }

    #[test]
    fn bound_override_for_unknown_entity_is_fatal_at_build() {
        let result = NetworkBuilder::new()
            .with_entity(two_level_def("gene_a"))
            .with_level_bounds(
                "gene_b",
                vec![
                    LevelBound {
                        lower_bound: 0.0,
                        upper_bound: 0.0,
                    },
                    LevelBound {
                        lower_bound: 0.0,
                        upper_bound: 1.0,
                    },
                ],
            )
            .build();
        assert!(matches!(result, Err(RegfluxError::UnknownEntity(_))));
    }

    #[test]
    fn level_bound_count_mismatch_is_rejected() {
        let mut def = two_level_def("gene_a");
        def.level_bounds.pop();
        let result = NetworkBuilder::new().with_entity(def).build();
        assert!(matches!(result, Err(RegfluxError::LevelBoundCount { .. })));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut def = two_level_def("gene_a");
        def.level_bounds[1] = LevelBound {
            lower_bound: 5.0,
            upper_bound: 1.0,
        };
        let result = NetworkBuilder::new().with_entity(def).build();
        assert!(matches!(result, Err(RegfluxError::InvalidBound { .. })));
    }

    #[test]
    fn initial_level_outside_declared_range_is_rejected() {
        let mut def = two_level_def("gene_a");
        def.initial_level = 2;
        let result = NetworkBuilder::new().with_entity(def).build();
        assert!(matches!(result, Err(RegfluxError::LevelOutOfRange { .. })));
    }
}

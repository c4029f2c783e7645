use crate::error::RegfluxError;
use crate::regulation::eval::ValueSnapshot;
use crate::regulation::transition::TransitionFunction;
use crate::regulation::translation::TranslationTable;
use regflux_schemas::constraint::Constraint;
use regflux_schemas::entity::Entity;
use serde::Serialize;
use std::collections::BTreeMap;

/// Entity id -> current discrete level at one point of the search.
/// Ordered so projections and displays are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscreteState {
    levels: BTreeMap<String, u32>,
}

impl DiscreteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, entity_id: &str, level: u32) {
        self.levels.insert(entity_id.to_string(), level);
    }

    pub fn level(&self, entity_id: &str) -> Option<u32> {
        self.levels.get(entity_id).copied()
    }

    pub fn levels(&self) -> &BTreeMap<String, u32> {
        &self.levels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.levels.iter().map(|(id, level)| (id.as_str(), *level))
    }
}

/// One regulated entity: its discrete level count, initial level, and
/// transition function.
#[derive(Debug, Clone)]
pub struct RegulatedEntity {
    pub entity: Entity,
    pub levels: u32,
    pub initial_level: u32,
    pub transition: TransitionFunction,
}

/// Owns the regulated entities, their transition functions, and the
/// constraint translation table. Conditions may reference entities
/// outside the network (e.g. reaction fluxes); only translation entries
/// are restricted to owned entities.
#[derive(Debug, Clone)]
pub struct InteractionNetwork {
    entities: BTreeMap<String, RegulatedEntity>,
    translation: TranslationTable,
}

impl InteractionNetwork {
    pub(crate) fn from_parts(
        entities: BTreeMap<String, RegulatedEntity>,
        translation: TranslationTable,
    ) -> Self {
        Self {
            entities,
            translation,
        }
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    pub fn entity(&self, entity_id: &str) -> Option<&RegulatedEntity> {
        self.entities.get(entity_id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &RegulatedEntity> {
        self.entities.values()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn translation(&self) -> &TranslationTable {
        &self.translation
    }

    pub fn initial_level(&self, entity_id: &str) -> Result<u32, RegfluxError> {
        self.entities
            .get(entity_id)
            .map(|e| e.initial_level)
            .ok_or_else(|| RegfluxError::UnknownEntity(entity_id.to_string()))
    }

    pub fn initial_state(&self) -> DiscreteState {
        let mut state = DiscreteState::new();
        for (id, entity) in &self.entities {
            state.set(id, entity.initial_level);
        }
        state
    }

    pub fn constraint_from_state(
        &self,
        entity_id: &str,
        level: u32,
    ) -> Result<&Constraint, RegfluxError> {
        self.translation.constraint_for(entity_id, level)
    }

    pub fn state_from_value(&self, entity_id: &str, value: f64) -> Result<u32, RegfluxError> {
        self.translation.level_for_value(entity_id, value)
    }

    /// Applies every entity's transition function to the snapshot and
    /// collects the next discrete levels.
    pub fn next_discrete_state(&self, values: &ValueSnapshot) -> DiscreteState {
        let mut next = DiscreteState::new();
        for (id, entity) in &self.entities {
            next.set(id, entity.transition.next_level(values));
        }
        next
    }

    /// The per-entity constraints encoding a discrete state, ordered by
    /// entity id.
    pub fn translate(&self, state: &DiscreteState) -> Result<Vec<Constraint>, RegfluxError> {
        let mut constraints = Vec::with_capacity(self.entities.len());
        for (id, entity) in &self.entities {
            let level = state.level(id).unwrap_or(entity.initial_level);
            constraints.push(self.translation.constraint_for(id, level)?.clone());
        }
        Ok(constraints)
    }

    /// Snapshot of a discrete state for condition evaluation: each
    /// regulated entity's translated bound window, keyed by id.
    pub fn snapshot_from_state(
        &self,
        state: &DiscreteState,
    ) -> Result<ValueSnapshot, RegfluxError> {
        let mut values = ValueSnapshot::new();
        for (id, entity) in &self.entities {
            let level = state.level(id).unwrap_or(entity.initial_level);
            values.insert(id.clone(), self.translation.constraint_for(id, level)?.clone());
        }
        Ok(values)
    }
}

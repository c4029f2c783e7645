use crate::error::RegfluxError;
use regflux_schemas::constraint::Constraint;
use std::collections::BTreeMap;

/// Maps (entity, discrete level) to the continuous bound constraint that
/// encodes the level. One `Vec<Constraint>` per entity, indexed by level.
///
/// Built and validated by the network builder; entries for entities the
/// network does not own are rejected at setup, not at evaluation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationTable {
    levels: BTreeMap<String, Vec<Constraint>>,
}

impl TranslationTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, entity_id: &str, bounds: Vec<Constraint>) {
        self.levels.insert(entity_id.to_string(), bounds);
    }

    pub fn constraint_for(&self, entity_id: &str, level: u32) -> Result<&Constraint, RegfluxError> {
        let bounds = self
            .levels
            .get(entity_id)
            .ok_or_else(|| RegfluxError::UnknownEntity(entity_id.to_string()))?;
        bounds
            .get(level as usize)
            .ok_or_else(|| RegfluxError::LevelOutOfRange {
                entity: entity_id.to_string(),
                level,
                levels: bounds.len() as u32,
            })
    }

    /// Inverse lookup: the first discrete level whose bound window
    /// contains `value`.
    pub fn level_for_value(&self, entity_id: &str, value: f64) -> Result<u32, RegfluxError> {
        let bounds = self
            .levels
            .get(entity_id)
            .ok_or_else(|| RegfluxError::UnknownEntity(entity_id.to_string()))?;
        bounds
            .iter()
            .position(|c| c.contains(value))
            .map(|level| level as u32)
            .ok_or(RegfluxError::NoLevelForValue {
                entity: entity_id.to_string(),
                value,
            })
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(|s| s.as_str())
    }

    pub fn level_count(&self, entity_id: &str) -> Option<u32> {
        self.levels.get(entity_id).map(|b| b.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TranslationTable {
        let mut table = TranslationTable::new();
        table.insert(
            "x",
            vec![
                Constraint::bound("x", 0.0, 0.0),
                Constraint::bound("x", 0.0, 5.0),
                Constraint::bound("x", 5.0, 10.0),
            ],
        );
        table
    }

    #[test]
    fn lookup_returns_the_level_window() {
        let table = table();
        let c = table.constraint_for("x", 2).unwrap();
        assert_eq!((c.lower_bound, c.upper_bound), (5.0, 10.0));
    }

    #[test]
    fn unknown_entity_and_level_are_errors() {
        let table = table();
        assert!(matches!(
            table.constraint_for("nope", 0),
            Err(RegfluxError::UnknownEntity(_))
        ));
        assert!(matches!(
            table.constraint_for("x", 3),
            Err(RegfluxError::LevelOutOfRange { .. })
        ));
    }

    #[test]
    fn level_for_value_picks_first_containing_window() {
        let table = table();
        // 0.0 is inside both level 0 and level 1; the first wins.
        assert_eq!(table.level_for_value("x", 0.0).unwrap(), 0);
        assert_eq!(table.level_for_value("x", 3.0).unwrap(), 1);
        assert_eq!(table.level_for_value("x", 7.5).unwrap(), 2);
        assert!(matches!(
            table.level_for_value("x", 11.0),
            Err(RegfluxError::NoLevelForValue { .. })
        ));
    }

    #[test]
    fn midpoint_round_trips_through_the_table() {
        let table = table();
        for level in 0..3u32 {
            let c = table.constraint_for("x", level).unwrap();
            let mid = c.midpoint().unwrap();
            // Interior points of a window map back to a level whose window
            // contains them; shared boundaries resolve to the first level.
            let back = table.level_for_value("x", mid).unwrap();
            let window = table.constraint_for("x", back).unwrap();
            assert!(window.contains(mid));
        }
    }
}

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Gene,
    Metabolite,
}

/// A gene or metabolite referenced by both regulatory rules and flux
/// constraints. Identity is the stable `id`; equality and hashing ignore
/// the display name and kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: EntityKind,
}

impl Entity {
    pub fn gene(id: &str) -> Self {
        Entity {
            id: id.to_string(),
            name: None,
            kind: EntityKind::Gene,
        }
    }

    pub fn metabolite(id: &str) -> Self {
        Entity {
            id: id.to_string(),
            name: None,
            kind: EntityKind::Metabolite,
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identity_is_the_id_alone() {
        let mut a = Entity::gene("b0001");
        a.name = Some("thrA".to_string());
        let b = Entity::metabolite("b0001");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&Entity::gene("b0002")));
    }
}

use anyhow::{Context, Result};
use regflux_schemas::{
    constraint::EntityBound,
    file_formats::{ConstraintsFile, NetworkFile, RegulationFile},
    network::MetabolicNetwork,
    rule::RegulatedEntityDef,
};
use std::{fs, path::Path};

/// A container for all the static data loaded from YAML files.
/// This represents the complete "knowledge base" for a run.
pub struct KnowledgeBase {
    pub network: MetabolicNetwork,
    pub base_constraints: Vec<EntityBound>,
    pub regulation: Option<Vec<RegulatedEntityDef>>,
}

impl KnowledgeBase {
    /// Loads the model, the optional environmental constraints, and the
    /// optional regulation network.
    pub fn load(
        model_path: &str,
        constraints_path: Option<&str>,
        regulation_path: Option<&str>,
    ) -> Result<Self> {
        println!("Loading knowledge base...");

        let network_file: NetworkFile = load_yaml(model_path)?;

        let base_constraints = match constraints_path {
            Some(path) => {
                let file: ConstraintsFile = load_yaml(path)?;
                file.constraints
            }
            None => Vec::new(),
        };

        let regulation = match regulation_path {
            Some(path) => {
                let file: RegulationFile = load_yaml(path)?;
                Some(file.entities)
            }
            None => None,
        };

        println!("Knowledge base loaded successfully.");
        Ok(Self {
            network: network_file.network,
            base_constraints,
            regulation,
        })
    }
}

fn load_yaml<T>(path: &str) -> Result<T>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let content = fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read file: {}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML from {}", path))
}

use crate::{constraint::EntityBound, network::MetabolicNetwork, rule::RegulatedEntityDef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkFile {
    pub schema_version: String,
    pub network: MetabolicNetwork,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConstraintsFile {
    pub schema_version: String,
    pub constraints: Vec<EntityBound>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegulationFile {
    pub schema_version: String,
    pub entities: Vec<RegulatedEntityDef>,
}

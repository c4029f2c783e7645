use crate::regulation::network::DiscreteState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegfluxError {
    #[error("Entity '{0}' is not part of the interaction network")]
    UnknownEntity(String),

    #[error("Transition function for '{0}' has no default interaction")]
    MissingDefaultInteraction(String),

    #[error("Transition function for '{0}' declares more than one default interaction")]
    MultipleDefaultInteractions(String),

    #[error("Default interaction '{0}' must not carry a condition")]
    DefaultHasCondition(String),

    #[error("Conditional interaction '{0}' is missing its condition")]
    MissingCondition(String),

    #[error("Level {level} is out of range for entity '{entity}' ({levels} levels declared)")]
    LevelOutOfRange {
        entity: String,
        level: u32,
        levels: u32,
    },

    #[error("Entity '{entity}' declares {expected} levels but {found} level bounds")]
    LevelBoundCount {
        entity: String,
        expected: u32,
        found: usize,
    },

    #[error("Invalid bound for '{entity}': lower bound {lower} exceeds upper bound {upper}")]
    InvalidBound {
        entity: String,
        lower: f64,
        upper: f64,
    },

    #[error("No discrete level of '{entity}' contains value {value}")]
    NoLevelForValue { entity: String, value: f64 },

    #[error("Unsupported aggregation policy: {0}")]
    UnsupportedAggregation(String),

    #[error("Attractor search did not converge within {iterations} iterations")]
    SearchDidNotConverge {
        iterations: usize,
        /// States visited before the cap was hit, kept for diagnosis.
        trajectory: Vec<DiscreteState>,
    },

    #[error("No regulation network has been loaded")]
    RegulationNotLoaded,

    #[error("No metabolic network has been loaded")]
    NetworkNotLoaded,

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Failed to process CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),

    #[error("An error occurred during logging: {0}")]
    LoggingError(#[from] anyhow::Error),
}

use crate::{
    error::RegfluxError,
    optimize::knockout::KnockoutRecord,
};
use serde::{Deserialize, Serialize};

/// One CSV row of a knockout screen.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScreenRow {
    pub entity_id: String,
    pub objective: Option<f64>,
    pub status: String,
}

/// Knockouts classified against the unperturbed objective.
#[derive(Debug, Default, Clone)]
pub struct EssentialityReport {
    pub essential: Vec<String>,
    pub impaired: Vec<String>,
    pub unaffected: Vec<String>,
}

/// Thresholds for essentiality classification, as fractions of the
/// wild-type objective.
#[derive(Debug, Clone, Copy)]
pub struct EssentialityThresholds {
    pub essential_fraction: f64,
    pub impaired_fraction: f64,
}

impl Default for EssentialityThresholds {
    fn default() -> Self {
        Self {
            essential_fraction: 0.01,
            impaired_fraction: 0.95,
        }
    }
}

pub fn write_screen_csv(path: &str, records: &[KnockoutRecord]) -> Result<(), RegfluxError> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| RegfluxError::CsvError(path.to_string(), e))?;
    for record in records {
        let row = ScreenRow {
            entity_id: record.entity_id.clone(),
            objective: record.result.objective,
            status: record.result.status.to_string(),
        };
        writer
            .serialize(row)
            .map_err(|e| RegfluxError::CsvError(path.to_string(), e))?;
    }
    writer
        .flush()
        .map_err(|e| RegfluxError::FileIO(path.to_string(), e))?;
    Ok(())
}

pub fn read_screen_csv(path: &str) -> Result<Vec<ScreenRow>, RegfluxError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| RegfluxError::CsvError(path.to_string(), e))?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: ScreenRow = result.map_err(|e| RegfluxError::CsvError(path.to_string(), e))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Classifies each knockout by the fraction of the wild-type objective
/// it retains. A knockout that failed to solve (infeasible or error)
/// counts as essential: the perturbed model supports no flux state.
pub fn classify_knockouts(
    records: &[KnockoutRecord],
    wild_type_objective: f64,
    thresholds: EssentialityThresholds,
) -> EssentialityReport {
    let mut report = EssentialityReport::default();
    for record in records {
        let bucket = match record.result.objective {
            Some(objective) if record.result.is_optimal() => {
                if objective < thresholds.essential_fraction * wild_type_objective {
                    &mut report.essential
                } else if objective < thresholds.impaired_fraction * wild_type_objective {
                    &mut report.impaired
                } else {
                    &mut report.unaffected
                }
            }
            _ => &mut report.essential,
        };
        bucket.push(record.entity_id.clone());
    }
    report.essential.sort();
    report.impaired.sort();
    report.unaffected.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::solver::OptimizationResult;
    use std::collections::BTreeMap;

    fn record(entity_id: &str, objective: f64) -> KnockoutRecord {
        KnockoutRecord {
            entity_id: entity_id.to_string(),
            result: OptimizationResult::optimal(objective, BTreeMap::new()),
        }
    }

    #[test]
    fn knockouts_are_classified_against_the_wild_type() {
        let records = vec![
            record("lethal", 0.0),
            record("slowed", 5.0),
            record("silent", 9.9),
            KnockoutRecord {
                entity_id: "blocked".to_string(),
                result: OptimizationResult::infeasible(),
            },
        ];
        let report =
            classify_knockouts(&records, 10.0, EssentialityThresholds::default());
        assert_eq!(report.essential, vec!["blocked", "lethal"]);
        assert_eq!(report.impaired, vec!["slowed"]);
        assert_eq!(report.unaffected, vec!["silent"]);
    }
}

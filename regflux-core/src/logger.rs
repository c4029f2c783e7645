use crate::optimize::solver::OptimizationResult;
use crate::regulation::network::DiscreteState;
use csv::Writer;
use serde::Serialize;
use std::fs;
use std::io;

#[derive(Debug, Serialize)]
struct LogEntry {
    iteration: usize,
    levels_json: String,
    objective: Option<f64>,
    status: String,
}

/// CSV logger for attractor-search trajectories: one row per iteration
/// with the discrete levels (JSON-encoded) and the optimization outcome.
pub struct TrajectoryLogger {
    writer: Writer<fs::File>,
}

impl TrajectoryLogger {
    pub fn new(path: &str) -> Result<Self, io::Error> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }

    pub fn log_iteration(
        &mut self,
        iteration: usize,
        state: &DiscreteState,
        result: &OptimizationResult,
    ) -> Result<(), anyhow::Error> {
        let levels_json = serde_json::to_string(state.levels())?;

        let entry = LogEntry {
            iteration,
            levels_json,
            objective: result.objective,
            status: result.status.to_string(),
        };

        self.writer.serialize(entry)?;
        self.writer.flush()?;
        Ok(())
    }
}

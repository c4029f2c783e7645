use crate::error::RegfluxError;
use crate::optimize::bind::FbaSession;
use crate::optimize::solver::{OptimizationResult, OptimizationStatus, Optimizer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

#[derive(Debug, Clone, PartialEq)]
pub struct KnockoutRecord {
    pub entity_id: String,
    pub result: OptimizationResult,
}

/// What a screen produced: every recorded knockout plus the first fatal
/// error, if one cancelled the remaining queue. Results recorded before
/// a cancellation are always kept.
#[derive(Debug)]
pub struct ScreenOutcome {
    pub records: Vec<KnockoutRecord>,
    pub failure: Option<RegfluxError>,
}

/// Monotonic completed-knockout counter, read for display only.
#[derive(Debug, Default)]
pub struct ScreenProgress {
    completed: AtomicUsize,
}

impl ScreenProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fans single-entity knockouts out across a fixed pool of worker
/// threads draining one shared queue.
///
/// Each worker clones the prepared session once and owns it exclusively:
/// no two threads ever mutate or solve on the same solver, at the cost
/// of one session copy per worker. Queue delivery is at-most-once per
/// entity; result order is not guaranteed.
pub struct KnockoutScreen {
    pub workers: usize,
    pub maximize: bool,
}

impl KnockoutScreen {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            maximize: true,
        }
    }

    pub fn run<S>(
        &self,
        session: &FbaSession<S>,
        targets: &[String],
        progress: &ScreenProgress,
    ) -> ScreenOutcome
    where
        S: Optimizer + Clone,
    {
        if self.workers == 1 {
            let mut session = session.clone();
            return self.run_sequential(&mut session, targets, progress);
        }

        let queue: Mutex<VecDeque<String>> = Mutex::new(targets.iter().cloned().collect());
        let records: Mutex<Vec<KnockoutRecord>> = Mutex::new(Vec::with_capacity(targets.len()));
        let cancelled = AtomicBool::new(false);
        let failure: Mutex<Option<RegfluxError>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..self.workers {
                let mut worker_session = session.clone();
                let queue = &queue;
                let records = &records;
                let cancelled = &cancelled;
                let failure = &failure;
                scope.spawn(move || {
                    while !cancelled.load(Ordering::Relaxed) {
                        let entity = queue.lock().unwrap().pop_front();
                        let Some(entity) = entity else { break };
                        match worker_session.knockout_objective(&entity, self.maximize) {
                            Ok(result) => {
                                if result.status == OptimizationStatus::SolverError {
                                    worker_session.sink().warn(&format!(
                                        "solver error while screening '{}'; cancelling remaining knockouts",
                                        entity
                                    ));
                                    cancelled.store(true, Ordering::Relaxed);
                                }
                                records.lock().unwrap().push(KnockoutRecord {
                                    entity_id: entity,
                                    result,
                                });
                                progress.increment();
                            }
                            Err(error) => {
                                cancelled.store(true, Ordering::Relaxed);
                                let mut slot = failure.lock().unwrap();
                                if slot.is_none() {
                                    *slot = Some(error);
                                }
                                break;
                            }
                        }
                    }
                });
            }
        });

        ScreenOutcome {
            records: records.into_inner().unwrap(),
            failure: failure.into_inner().unwrap(),
        }
    }

    /// Single-threaded screen over the same queue discipline; the oracle
    /// for the concurrent path.
    pub fn run_sequential<S: Optimizer>(
        &self,
        session: &mut FbaSession<S>,
        targets: &[String],
        progress: &ScreenProgress,
    ) -> ScreenOutcome {
        let mut records = Vec::with_capacity(targets.len());
        let mut failure = None;

        for entity in targets {
            match session.knockout_objective(entity, self.maximize) {
                Ok(result) => {
                    let solver_error = result.status == OptimizationStatus::SolverError;
                    if solver_error {
                        session.sink().warn(&format!(
                            "solver error while screening '{}'; cancelling remaining knockouts",
                            entity
                        ));
                    }
                    records.push(KnockoutRecord {
                        entity_id: entity.clone(),
                        result,
                    });
                    progress.increment();
                    if solver_error {
                        break;
                    }
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        ScreenOutcome { records, failure }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SilentSink;
    use crate::optimize::solver::{ConstraintHandle, IntervalOptimizer};
    use crate::regulation::builder::NetworkBuilder;
    use regflux_schemas::constraint::Constraint;
    use regflux_schemas::entity::EntityKind;
    use regflux_schemas::network::{MetabolicNetwork, Reaction};
    use regflux_schemas::rule::{
        ComparisonOperator, Condition, Interaction, LevelBound, RegulatedEntityDef,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn reaction(id: &str, lower_bound: f64, upper_bound: f64, objective: f64) -> Reaction {
        Reaction {
            id: id.to_string(),
            name: None,
            stoichiometry: BTreeMap::new(),
            lower_bound,
            upper_bound,
            objective_coefficient: objective,
            annotation: None,
        }
    }

    fn prepared_session() -> FbaSession<IntervalOptimizer> {
        let model = MetabolicNetwork {
            id: "toy".to_string(),
            reactions: vec![
                reaction("r_a", 0.0, 10.0, 0.0),
                reaction("r_b", 0.0, 6.0, 0.0),
                reaction("r_growth", 0.0, 8.0, 1.0),
            ],
        };
        let regulation = NetworkBuilder::new()
            .with_entity(RegulatedEntityDef {
                id: "gene_g".to_string(),
                name: None,
                kind: EntityKind::Gene,
                levels: 2,
                initial_level: 1,
                level_bounds: vec![
                    LevelBound {
                        lower_bound: 0.0,
                        upper_bound: 0.0,
                    },
                    LevelBound {
                        lower_bound: 0.0,
                        upper_bound: 1.0,
                    },
                ],
                interactions: vec![Interaction {
                    name: "g_on".to_string(),
                    condition: Some(Condition::Threshold {
                        entity_id: "r_a".to_string(),
                        operator: ComparisonOperator::GreaterEq,
                        threshold: 1.0,
                        priority: 0,
                    }),
                    target_level: 1,
                    start: None,
                    duration: None,
                }],
                default: Interaction {
                    name: "g_off".to_string(),
                    condition: None,
                    target_level: 0,
                    start: None,
                    duration: None,
                },
            })
            .build()
            .unwrap();

        let mut session = FbaSession::new(IntervalOptimizer::new());
        session.set_sink(Arc::new(SilentSink));
        session.set_network(model);
        session.set_regulation(regulation);
        session.prepare_solver().unwrap();
        session.evaluate_regulation(None).unwrap();
        session
    }

    fn sorted(mut records: Vec<KnockoutRecord>) -> Vec<KnockoutRecord> {
        records.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        records
    }

    #[test]
    fn every_entity_is_screened_exactly_once() {
        let session = prepared_session();
        let targets: Vec<String> = ["r_a", "r_b", "r_growth", "gene_g"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let progress = ScreenProgress::new();

        let outcome = KnockoutScreen::new(3).run(&session, &targets, &progress);
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.records.len(), targets.len());
        assert_eq!(progress.completed(), targets.len());

        let mut screened: Vec<&str> = outcome
            .records
            .iter()
            .map(|r| r.entity_id.as_str())
            .collect();
        screened.sort();
        assert_eq!(screened, vec!["gene_g", "r_a", "r_b", "r_growth"]);
    }

    #[test]
    fn concurrent_screen_matches_the_sequential_oracle() {
        let targets: Vec<String> = ["r_a", "r_b", "r_growth", "gene_g"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut oracle_session = prepared_session();
        let oracle = KnockoutScreen::new(1).run_sequential(
            &mut oracle_session,
            &targets,
            &ScreenProgress::new(),
        );

        let session = prepared_session();
        let concurrent = KnockoutScreen::new(4).run(&session, &targets, &ScreenProgress::new());

        assert!(oracle.failure.is_none());
        assert!(concurrent.failure.is_none());
        assert_eq!(sorted(oracle.records), sorted(concurrent.records));
    }

    /// Scripted optimizer: errors whenever a forced-zero row for the
    /// poisoned entity is present.
    #[derive(Clone)]
    struct PoisonedOptimizer {
        inner: IntervalOptimizer,
        poisoned: String,
        active: BTreeMap<ConstraintHandle, String>,
    }

    impl Optimizer for PoisonedOptimizer {
        fn add_constraint(&mut self, constraint: Constraint) -> ConstraintHandle {
            let entity = constraint
                .single_entity()
                .map(|(id, _)| id.to_string())
                .unwrap_or_default();
            let zeroed = constraint.lower_bound == 0.0 && constraint.upper_bound == 0.0;
            let handle = self.inner.add_constraint(constraint);
            if zeroed && entity == self.poisoned {
                self.active.insert(handle, entity);
            }
            handle
        }

        fn remove_constraint(&mut self, handle: ConstraintHandle) {
            self.active.remove(&handle);
            self.inner.remove_constraint(handle);
        }

        fn set_objective(&mut self, coefficients: &BTreeMap<String, f64>) {
            self.inner.set_objective(coefficients);
        }

        fn set_direction(&mut self, maximize: bool) {
            self.inner.set_direction(maximize);
        }

        fn solve(&mut self) -> OptimizationResult {
            if !self.active.is_empty() {
                return OptimizationResult::solver_error("numerical breakdown");
            }
            self.inner.solve()
        }
    }

    #[test]
    fn solver_error_cancels_the_remaining_queue_but_keeps_records() {
        let model = MetabolicNetwork {
            id: "toy".to_string(),
            reactions: vec![
                reaction("r_a", 0.0, 10.0, 0.0),
                reaction("r_bad", 0.0, 5.0, 0.0),
                reaction("r_growth", 0.0, 8.0, 1.0),
            ],
        };
        let mut session = FbaSession::new(PoisonedOptimizer {
            inner: IntervalOptimizer::new(),
            poisoned: "r_bad".to_string(),
            active: BTreeMap::new(),
        });
        session.set_sink(Arc::new(SilentSink));
        session.set_network(model);
        session.prepare_solver().unwrap();

        let targets: Vec<String> = ["r_a", "r_bad", "r_growth"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let outcome =
            KnockoutScreen::new(1).run_sequential(&mut session, &targets, &ScreenProgress::new());

        assert!(outcome.failure.is_none());
        // r_a recorded, r_bad recorded with the error status, r_growth
        // never screened.
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(
            outcome.records[1].result.status,
            OptimizationStatus::SolverError
        );
    }
}

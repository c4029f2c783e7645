use crate::diagnostics::{DiagnosticSink, StderrSink};
use crate::error::RegfluxError;
use crate::logger::TrajectoryLogger;
use crate::optimize::solver::{
    ConstraintHandle, OptimizationResult, Optimizer, ScopedConstraints,
};
use crate::regulation::attractor::{self, Attractor, SearchConfig};
use crate::regulation::builder::NetworkBuilder;
use crate::regulation::network::InteractionNetwork;
use regflux_schemas::constraint::Constraint;
use regflux_schemas::file_formats::{ConstraintsFile, NetworkFile, RegulationFile};
use regflux_schemas::network::MetabolicNetwork;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Bridges the discrete regulatory layer and the continuous optimizer.
///
/// Owns the solver, the structural model, the base (environmental)
/// constraints, and optionally an interaction network together with the
/// steady-state constraints computed from its current attractor. Every
/// `solve` layers its temporary constraints under a scoped guard, so the
/// solver's permanent set never leaks between calls.
#[derive(Clone)]
pub struct FbaSession<S: Optimizer> {
    solver: S,
    network: Option<MetabolicNetwork>,
    base_constraints: Vec<Constraint>,
    regulation: Option<InteractionNetwork>,
    steady_constraints: Option<Vec<Constraint>>,
    bound_rows: BTreeMap<String, (ConstraintHandle, Constraint)>,
    search_config: SearchConfig,
    sink: Arc<dyn DiagnosticSink>,
    prepared: bool,
}

impl<S: Optimizer> FbaSession<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            network: None,
            base_constraints: Vec::new(),
            regulation: None,
            steady_constraints: None,
            bound_rows: BTreeMap::new(),
            search_config: SearchConfig::default(),
            sink: Arc::new(StderrSink),
            prepared: false,
        }
    }

    pub fn set_sink(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    pub fn set_search_config(&mut self, config: SearchConfig) {
        self.search_config = config;
    }

    pub fn set_network(&mut self, network: MetabolicNetwork) {
        self.network = Some(network);
    }

    pub fn network(&self) -> Option<&MetabolicNetwork> {
        self.network.as_ref()
    }

    pub fn set_regulation(&mut self, regulation: InteractionNetwork) {
        self.regulation = Some(regulation);
        self.steady_constraints = None;
    }

    pub fn regulation(&self) -> Option<&InteractionNetwork> {
        self.regulation.as_ref()
    }

    pub fn steady_constraints(&self) -> Option<&[Constraint]> {
        self.steady_constraints.as_deref()
    }

    pub fn add_base_constraint(&mut self, constraint: Constraint) {
        self.base_constraints.push(constraint);
    }

    /// Loads the structural metabolic model from a YAML network file.
    pub fn load_network(&mut self, path: &Path) -> Result<(), RegfluxError> {
        let file: NetworkFile = read_yaml(path)?;
        self.network = Some(file.network);
        Ok(())
    }

    /// Loads environmental bound windows from a YAML constraints file.
    ///
    /// # Errors
    ///
    /// Rejects rows whose lower bound exceeds their upper bound.
    pub fn load_constraints_file(&mut self, path: &Path) -> Result<(), RegfluxError> {
        let file: ConstraintsFile = read_yaml(path)?;
        for entry in file.constraints {
            if entry.lower_bound > entry.upper_bound {
                return Err(RegfluxError::InvalidBound {
                    entity: entry.entity_id,
                    lower: entry.lower_bound,
                    upper: entry.upper_bound,
                });
            }
            self.base_constraints.push(entry.to_constraint());
        }
        Ok(())
    }

    /// Loads and validates the qualitative regulatory network from a
    /// YAML regulation file.
    pub fn load_regulation_network(&mut self, path: &Path) -> Result<(), RegfluxError> {
        let file: RegulationFile = read_yaml(path)?;
        let regulation = NetworkBuilder::new().with_entities(file.entities).build()?;
        self.set_regulation(regulation);
        Ok(())
    }

    /// Pushes the model into the solver: one bound row per reaction
    /// (remembered so knockouts can replace it), one mass-balance
    /// coupling row per metabolite, the base constraints, and the
    /// objective. Idempotent after the first call.
    pub fn prepare_solver(&mut self) -> Result<(), RegfluxError> {
        if self.prepared {
            return Ok(());
        }
        let network = self.network.as_ref().ok_or(RegfluxError::NetworkNotLoaded)?;

        for reaction in &network.reactions {
            let row = Constraint::bound(&reaction.id, reaction.lower_bound, reaction.upper_bound);
            let handle = self.solver.add_constraint(row.clone());
            self.bound_rows.insert(reaction.id.clone(), (handle, row));
        }

        let mut balances: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for reaction in &network.reactions {
            for (metabolite, coefficient) in &reaction.stoichiometry {
                balances
                    .entry(metabolite.clone())
                    .or_default()
                    .insert(reaction.id.clone(), *coefficient);
            }
        }
        for (_, coefficients) in balances {
            self.solver.add_constraint(Constraint {
                coefficients,
                lower_bound: 0.0,
                upper_bound: 0.0,
            });
        }

        for constraint in &self.base_constraints {
            self.solver.add_constraint(constraint.clone());
        }

        self.solver.set_objective(&network.objective());
        self.prepared = true;
        Ok(())
    }

    /// Runs the repeated-state search for the attached regulation
    /// network and caches its steady-state constraints for subsequent
    /// `solve` calls. Inner iterations maximize the model objective.
    pub fn evaluate_regulation(
        &mut self,
        logger: Option<&mut TrajectoryLogger>,
    ) -> Result<Attractor, RegfluxError> {
        let regulation = self
            .regulation
            .as_ref()
            .ok_or(RegfluxError::RegulationNotLoaded)?;
        let solver = &mut self.solver;

        let attractor = attractor::search(
            regulation,
            |extra| {
                let mut scope = ScopedConstraints::new(&mut *solver);
                for constraint in extra {
                    scope.add(constraint.clone());
                }
                scope.solver().set_direction(true);
                scope.solver().solve()
            },
            &self.search_config,
            logger,
        )?;

        self.steady_constraints = Some(attractor.steady_constraints.clone());
        Ok(attractor)
    }

    /// One optimization under the temporarily layered `extra`
    /// constraints. When `evaluate_network` is set and a regulation
    /// network is attached, the attractor search is re-run first;
    /// otherwise the network's cached steady-state constraints (if any)
    /// are reused as-is. All temporary rows are removed on return.
    pub fn solve(
        &mut self,
        extra: &[Constraint],
        maximize: bool,
        evaluate_network: bool,
    ) -> Result<OptimizationResult, RegfluxError> {
        if evaluate_network && self.regulation.is_some() {
            self.evaluate_regulation(None)?;
        }

        let mut scope = ScopedConstraints::new(&mut self.solver);
        for constraint in extra {
            scope.add(constraint.clone());
        }
        if let Some(steady) = &self.steady_constraints {
            for constraint in steady {
                scope.add(constraint.clone());
            }
        }
        scope.solver().set_direction(maximize);
        let result = scope.solver().solve();
        drop(scope);
        Ok(result)
    }

    /// Objective under a single-entity knockout: the entity's bound row
    /// is replaced by a forced-zero bound, regulation is re-evaluated
    /// only when the network contains the entity, and both the bound row
    /// and the cached steady-state constraints are restored on every
    /// path before returning.
    pub fn knockout_objective(
        &mut self,
        entity_id: &str,
        maximize: bool,
    ) -> Result<OptimizationResult, RegfluxError> {
        let saved_steady = self.steady_constraints.clone();
        let in_network = self
            .regulation
            .as_ref()
            .map_or(false, |n| n.contains(entity_id));

        let original = self.bound_rows.remove(entity_id);
        if let Some((handle, _)) = &original {
            self.solver.remove_constraint(*handle);
        }
        let knockout_handle = self.solver.add_constraint(Constraint::fixed(entity_id, 0.0));

        let mut evaluation = Ok(());
        if in_network {
            if let Err(error) = self.evaluate_regulation(None) {
                evaluation = Err(error);
            }
        }
        let result = match evaluation {
            Ok(()) => self.solve(&[], maximize, false),
            Err(error) => Err(error),
        };

        self.solver.remove_constraint(knockout_handle);
        if let Some((_, row)) = original {
            let handle = self.solver.add_constraint(row.clone());
            self.bound_rows.insert(entity_id.to_string(), (handle, row));
        }
        self.steady_constraints = saved_steady;

        result
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, RegfluxError> {
    let content = fs::read_to_string(path)
        .map_err(|e| RegfluxError::FileIO(path.display().to_string(), e))?;
    serde_yaml::from_str(&content)
        .map_err(|e| RegfluxError::YamlParsing(path.display().to_string(), e))
}

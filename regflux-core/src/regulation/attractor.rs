use crate::error::RegfluxError;
use crate::logger::TrajectoryLogger;
use crate::optimize::solver::{OptimizationResult, OptimizationStatus};
use crate::regulation::eval::ValueSnapshot;
use crate::regulation::network::{DiscreteState, InteractionNetwork};
use ordered_float::OrderedFloat;
use regflux_schemas::constraint::Constraint;
use std::collections::HashMap;

/// Bound-window shape tag carried by a [`SimplifiedConstraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundKind {
    Fixed,
    Window,
    LowerOnly,
    UpperOnly,
    Free,
}

/// A reduced, hashable projection of a constraint, used purely for
/// visited-state deduplication. Equality is structural (id, value, kind)
/// so two occurrences of the same regulatory state in a trajectory
/// collapse to one set element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimplifiedConstraint {
    pub entity_id: String,
    pub value: OrderedFloat<f64>,
    pub kind: BoundKind,
}

impl SimplifiedConstraint {
    /// The representative value is the window midpoint when both bounds
    /// are finite, otherwise the finite bound (0 for a free window).
    pub fn from_constraint(entity_id: &str, constraint: &Constraint) -> Self {
        let lb = constraint.lower_bound;
        let ub = constraint.upper_bound;
        let (value, kind) = if lb.is_finite() && ub.is_finite() {
            if lb == ub {
                (lb, BoundKind::Fixed)
            } else {
                ((lb + ub) / 2.0, BoundKind::Window)
            }
        } else if lb.is_finite() {
            (lb, BoundKind::LowerOnly)
        } else if ub.is_finite() {
            (ub, BoundKind::UpperOnly)
        } else {
            (0.0, BoundKind::Free)
        };
        Self {
            entity_id: entity_id.to_string(),
            value: OrderedFloat(value),
            kind,
        }
    }
}

/// Iteration cap for the repeated-state search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_iterations: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

/// Result of a converged repeated-state search: the distinct states
/// visited, the index where the cycle begins, and the steady-state
/// constraints invariant across every cycle state.
#[derive(Debug, Clone)]
pub struct Attractor {
    pub trajectory: Vec<DiscreteState>,
    pub cycle_start: usize,
    pub steady_constraints: Vec<Constraint>,
}

impl Attractor {
    /// The states of the detected cycle, in visitation order.
    pub fn cycle(&self) -> &[DiscreteState] {
        &self.trajectory[self.cycle_start..]
    }

    pub fn is_fixed_point(&self) -> bool {
        self.cycle().len() == 1
    }
}

/// Drives the discrete layer to a repeated state.
///
/// Starting from the network's initial levels, each iteration translates
/// the current state into constraints, runs one optimization under them,
/// feeds the resulting values (overlaid on the translated windows) back
/// through the transition functions, and checks the new state's
/// projection against everything seen so far. A repeated projection
/// closes the cycle; exceeding the iteration cap is a fatal
/// non-convergence error carrying the partial trajectory.
pub fn search<F>(
    network: &InteractionNetwork,
    mut solve: F,
    config: &SearchConfig,
    mut logger: Option<&mut TrajectoryLogger>,
) -> Result<Attractor, RegfluxError>
where
    F: FnMut(&[Constraint]) -> OptimizationResult,
{
    let mut current = network.initial_state();
    let mut trajectory: Vec<DiscreteState> = Vec::new();
    let mut visited: HashMap<Vec<SimplifiedConstraint>, usize> = HashMap::new();

    visited.insert(project(network, &current)?, 0);
    trajectory.push(current.clone());

    for iteration in 1..=config.max_iterations {
        let constraints = network.translate(&current)?;
        let result = solve(&constraints);

        if let Some(logger) = logger.as_deref_mut() {
            logger.log_iteration(iteration, &current, &result)?;
        }

        // Conditions see the regulated entities' translated windows,
        // overlaid with the solver's per-entity values when it found an
        // optimum. An infeasible iteration still advances the discrete
        // layer on the windows alone.
        let mut values: ValueSnapshot = network.snapshot_from_state(&current)?;
        if result.status == OptimizationStatus::Optimal {
            for (id, value) in &result.values {
                values.insert(id.clone(), Constraint::fixed(id, *value));
            }
        }

        let next = network.next_discrete_state(&values);
        let projection = project(network, &next)?;

        if let Some(&first_seen) = visited.get(&projection) {
            let steady_constraints = steady_constraints(network, &trajectory[first_seen..])?;
            return Ok(Attractor {
                trajectory,
                cycle_start: first_seen,
                steady_constraints,
            });
        }

        visited.insert(projection, trajectory.len());
        trajectory.push(next.clone());
        current = next;
    }

    Err(RegfluxError::SearchDidNotConverge {
        iterations: config.max_iterations,
        trajectory,
    })
}

/// Projects a discrete state into its set-dedup form: the simplified
/// translated constraint of every regulated entity, ordered by id.
fn project(
    network: &InteractionNetwork,
    state: &DiscreteState,
) -> Result<Vec<SimplifiedConstraint>, RegfluxError> {
    let mut projection = Vec::with_capacity(network.len());
    for entity in network.entities() {
        let id = &entity.entity.id;
        let level = state.level(id).unwrap_or(entity.initial_level);
        let constraint = network.constraint_from_state(id, level)?;
        projection.push(SimplifiedConstraint::from_constraint(id, constraint));
    }
    projection.sort();
    Ok(projection)
}

/// The subset of per-entity constraints whose bounds are identical
/// across every state of the cycle. Entities whose translated bounds
/// vary within the cycle are excluded: they are not a fixed point.
fn steady_constraints(
    network: &InteractionNetwork,
    cycle: &[DiscreteState],
) -> Result<Vec<Constraint>, RegfluxError> {
    let mut steady = Vec::new();
    for entity in network.entities() {
        let id = &entity.entity.id;
        let mut windows = cycle.iter().map(|state| {
            let level = state.level(id).unwrap_or(entity.initial_level);
            network.constraint_from_state(id, level)
        });
        let first = match windows.next() {
            Some(first) => first?,
            None => continue,
        };
        let mut invariant = true;
        for window in windows {
            if !window?.bounds_equal(first) {
                invariant = false;
                break;
            }
        }
        if invariant {
            steady.push(first.clone());
        }
    }
    Ok(steady)
}

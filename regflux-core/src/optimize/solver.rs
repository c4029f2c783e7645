use regflux_schemas::constraint::Constraint;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    Optimal,
    Infeasible,
    SolverError,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptimizationStatus::Optimal => "optimal",
            OptimizationStatus::Infeasible => "infeasible",
            OptimizationStatus::SolverError => "solver_error",
        };
        f.write_str(s)
    }
}

/// Outcome of one optimization call. Solver failure is data, not an
/// error: batch drivers decide for themselves whether a failed entity
/// aborts the whole screen.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub objective: Option<f64>,
    pub status: OptimizationStatus,
    pub values: BTreeMap<String, f64>,
    pub message: Option<String>,
}

impl OptimizationResult {
    pub fn optimal(objective: f64, values: BTreeMap<String, f64>) -> Self {
        Self {
            objective: Some(objective),
            status: OptimizationStatus::Optimal,
            values,
            message: None,
        }
    }

    pub fn infeasible() -> Self {
        Self {
            objective: None,
            status: OptimizationStatus::Infeasible,
            values: BTreeMap::new(),
            message: None,
        }
    }

    pub fn solver_error(message: &str) -> Self {
        Self {
            objective: None,
            status: OptimizationStatus::SolverError,
            values: BTreeMap::new(),
            message: Some(message.to_string()),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == OptimizationStatus::Optimal
    }
}

pub type ConstraintHandle = usize;

/// The opaque optimizer seam. The engine only ever adds and removes
/// constraints, sets the objective and its direction, and solves; an LP
/// backend plugs in behind this trait.
pub trait Optimizer: Send {
    fn add_constraint(&mut self, constraint: Constraint) -> ConstraintHandle;
    fn remove_constraint(&mut self, handle: ConstraintHandle);
    fn set_objective(&mut self, coefficients: &BTreeMap<String, f64>);
    fn set_direction(&mut self, maximize: bool);
    fn solve(&mut self) -> OptimizationResult;
}

/// RAII scope for temporarily layered constraints: everything added
/// through the scope is removed (in reverse order) when it drops, on
/// every exit path. The solver's permanent set is identical before and
/// after the scope's lifetime.
pub struct ScopedConstraints<'a, S: Optimizer + ?Sized> {
    solver: &'a mut S,
    handles: Vec<ConstraintHandle>,
}

impl<'a, S: Optimizer + ?Sized> ScopedConstraints<'a, S> {
    pub fn new(solver: &'a mut S) -> Self {
        Self {
            solver,
            handles: Vec::new(),
        }
    }

    pub fn add(&mut self, constraint: Constraint) {
        let handle = self.solver.add_constraint(constraint);
        self.handles.push(handle);
    }

    pub fn solver(&mut self) -> &mut S {
        &mut *self.solver
    }
}

impl<'a, S: Optimizer + ?Sized> Drop for ScopedConstraints<'a, S> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..).rev() {
            self.solver.remove_constraint(handle);
        }
    }
}

/// Deterministic interval-relaxation stand-in for an LP backend.
///
/// Each variable's window is the intersection of every single-entity
/// bound row naming it (scaled by the row's coefficient); coupling rows
/// spanning several entities are carried but do not tighten windows.
/// Objective variables resolve to the optimizing end of their window,
/// other variables to the midpoint (or the finite end). An empty window
/// is infeasible; an unbounded optimizing end is a solver error.
#[derive(Debug, Clone, Default)]
pub struct IntervalOptimizer {
    constraints: BTreeMap<ConstraintHandle, Constraint>,
    objective: BTreeMap<String, f64>,
    maximize: bool,
    next_handle: ConstraintHandle,
}

impl IntervalOptimizer {
    pub fn new() -> Self {
        Self {
            maximize: true,
            ..Self::default()
        }
    }

    /// Number of rows currently held, temporary scopes included.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// The held rows in insertion (handle) order, for state comparisons.
    pub fn constraint_snapshot(&self) -> Vec<Constraint> {
        self.constraints.values().cloned().collect()
    }

    fn window_for(&self, entity: &str) -> (f64, f64) {
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for constraint in self.constraints.values() {
            if let Some((id, coefficient)) = constraint.single_entity() {
                if id != entity || coefficient == 0.0 {
                    continue;
                }
                let mut l = constraint.lower_bound / coefficient;
                let mut h = constraint.upper_bound / coefficient;
                if coefficient < 0.0 {
                    std::mem::swap(&mut l, &mut h);
                }
                lo = lo.max(l);
                hi = hi.min(h);
            }
        }
        (lo, hi)
    }
}

impl Optimizer for IntervalOptimizer {
    fn add_constraint(&mut self, constraint: Constraint) -> ConstraintHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.constraints.insert(handle, constraint);
        handle
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) {
        self.constraints.remove(&handle);
    }

    fn set_objective(&mut self, coefficients: &BTreeMap<String, f64>) {
        self.objective = coefficients.clone();
    }

    fn set_direction(&mut self, maximize: bool) {
        self.maximize = maximize;
    }

    fn solve(&mut self) -> OptimizationResult {
        let mut entities: BTreeSet<&str> = BTreeSet::new();
        for constraint in self.constraints.values() {
            if let Some((id, coefficient)) = constraint.single_entity() {
                if coefficient != 0.0 {
                    entities.insert(id);
                }
            }
        }

        let mut values = BTreeMap::new();
        for id in entities {
            let (lo, hi) = self.window_for(id);
            if lo > hi {
                return OptimizationResult::infeasible();
            }
            let objective_coefficient = self.objective.get(id).copied().unwrap_or(0.0);
            let value = if objective_coefficient != 0.0 {
                let toward_upper = (objective_coefficient > 0.0) == self.maximize;
                let end = if toward_upper { hi } else { lo };
                if !end.is_finite() {
                    return OptimizationResult::solver_error(&format!(
                        "objective variable '{}' is unbounded",
                        id
                    ));
                }
                end
            } else if lo == hi {
                lo
            } else if lo.is_finite() && hi.is_finite() {
                (lo + hi) / 2.0
            } else if lo.is_finite() {
                lo
            } else if hi.is_finite() {
                hi
            } else {
                0.0
            };
            values.insert(id.to_string(), value);
        }

        let mut objective = 0.0;
        for (id, coefficient) in &self.objective {
            match values.get(id) {
                Some(value) => objective += coefficient * value,
                None => {
                    return OptimizationResult::solver_error(&format!(
                        "objective variable '{}' has no bound row",
                        id
                    ))
                }
            }
        }
        OptimizationResult::optimal(objective, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_intersect_across_rows() {
        let mut solver = IntervalOptimizer::new();
        solver.add_constraint(Constraint::bound("v", 0.0, 10.0));
        solver.add_constraint(Constraint::bound("v", 2.0, 20.0));
        let mut objective = BTreeMap::new();
        objective.insert("v".to_string(), 1.0);
        solver.set_objective(&objective);

        let result = solver.solve();
        assert!(result.is_optimal());
        assert_eq!(result.objective, Some(10.0));
        assert_eq!(result.values.get("v"), Some(&10.0));
    }

    #[test]
    fn minimize_picks_the_lower_end() {
        let mut solver = IntervalOptimizer::new();
        solver.add_constraint(Constraint::bound("v", 2.0, 10.0));
        let mut objective = BTreeMap::new();
        objective.insert("v".to_string(), 1.0);
        solver.set_objective(&objective);
        solver.set_direction(false);

        assert_eq!(solver.solve().objective, Some(2.0));
    }

    #[test]
    fn negative_coefficient_scales_and_flips_the_window() {
        let mut solver = IntervalOptimizer::new();
        let mut coefficients = BTreeMap::new();
        coefficients.insert("v".to_string(), -2.0);
        solver.add_constraint(Constraint {
            coefficients,
            lower_bound: -10.0,
            upper_bound: 4.0,
        });
        // -10 <= -2v <= 4  =>  -2 <= v <= 5
        let mut objective = BTreeMap::new();
        objective.insert("v".to_string(), 1.0);
        solver.set_objective(&objective);
        assert_eq!(solver.solve().objective, Some(5.0));
    }

    #[test]
    fn empty_window_is_infeasible() {
        let mut solver = IntervalOptimizer::new();
        solver.add_constraint(Constraint::bound("v", 5.0, 10.0));
        solver.add_constraint(Constraint::fixed("v", 0.0));
        assert_eq!(solver.solve().status, OptimizationStatus::Infeasible);
    }

    #[test]
    fn unbounded_objective_is_a_solver_error() {
        let mut solver = IntervalOptimizer::new();
        solver.add_constraint(Constraint::at_least("v", 0.0));
        let mut objective = BTreeMap::new();
        objective.insert("v".to_string(), 1.0);
        solver.set_objective(&objective);
        assert_eq!(solver.solve().status, OptimizationStatus::SolverError);
    }

    #[test]
    fn scoped_constraints_release_on_drop() {
        let mut solver = IntervalOptimizer::new();
        solver.add_constraint(Constraint::bound("v", 0.0, 10.0));
        let before = solver.constraint_snapshot();

        {
            let mut scope = ScopedConstraints::new(&mut solver);
            scope.add(Constraint::fixed("v", 0.0));
            scope.add(Constraint::at_most("w", 3.0));
            assert_eq!(scope.solver().constraint_count(), 3);
        }

        assert_eq!(solver.constraint_snapshot(), before);
    }

    #[test]
    fn scoped_constraints_release_on_early_exit() {
        fn solve_with_temp(solver: &mut IntervalOptimizer, fail: bool) -> Result<(), ()> {
            let mut scope = ScopedConstraints::new(solver);
            scope.add(Constraint::fixed("v", 1.0));
            if fail {
                return Err(());
            }
            scope.solver().solve();
            Ok(())
        }

        let mut solver = IntervalOptimizer::new();
        solver.add_constraint(Constraint::bound("v", 0.0, 10.0));
        let before = solver.constraint_snapshot();
        let _ = solve_with_temp(&mut solver, true);
        assert_eq!(solver.constraint_snapshot(), before);
    }
}

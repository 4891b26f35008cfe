//! Adapter for rustsat solver backends

use super::{SATSolver, SolveStatus};
use crate::error::SolverError;
use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Clause, Lit, TernaryVal, Var};

/// Wraps any rustsat solver behind [`SATSolver`]
///
/// ```
/// use alloy_finder::engine::{rustsat_adapter::RustSatAdapter, SATSolver, SolveStatus};
/// use rustsat_batsat::BasicSolver;
///
/// let mut solver = RustSatAdapter::new(BasicSolver::default());
/// solver.add_variables(1);
/// solver.add_clause(&[1]).unwrap();
/// assert_eq!(solver.solve().unwrap(), SolveStatus::Sat);
/// ```
pub struct RustSatAdapter<S> {
    solver: S,
    num_vars: u32,
    num_clauses: u32,
}

impl<S> RustSatAdapter<S> {
    /// Creates a new adapter wrapping the given solver
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            num_vars: 0,
            num_clauses: 0,
        }
    }
}

fn literal(lit: i32) -> Result<Lit, SolverError> {
    let var = lit.unsigned_abs();
    if var == 0 || var - 1 > Var::MAX_IDX {
        return Err(SolverError::VariableLimit(var));
    }
    let var = Var::new(var - 1);
    Ok(if lit > 0 { var.pos_lit() } else { var.neg_lit() })
}

impl<S: Solve> SATSolver for RustSatAdapter<S> {
    fn add_variables(&mut self, num_vars: u32) {
        // rustsat creates variables as clauses mention them
        self.num_vars += num_vars;
    }

    fn add_clause(&mut self, lits: &[i32]) -> Result<(), SolverError> {
        let lits = lits.iter().map(|&l| literal(l)).collect::<Result<Vec<Lit>, _>>()?;
        self.num_clauses += 1;
        self.solver
            .add_clause(Clause::from(&lits[..]))
            .map_err(|e| SolverError::Backend(e.to_string()))
    }

    fn solve(&mut self) -> Result<SolveStatus, SolverError> {
        match self.solver.solve() {
            Ok(SolverResult::Sat) => Ok(SolveStatus::Sat),
            Ok(SolverResult::Unsat) => Ok(SolveStatus::Unsat),
            Ok(SolverResult::Interrupted) => Ok(SolveStatus::Interrupted),
            Err(e) => Err(SolverError::Backend(e.to_string())),
        }
    }

    fn value_of(&self, var: u32) -> bool {
        if var == 0 || var > self.num_vars {
            return false;
        }
        let v = Var::new(var - 1);
        match self.solver.solution(v) {
            Ok(assignment) => matches!(assignment.var_value(v), TernaryVal::True),
            Err(_) => false,
        }
    }

    fn num_variables(&self) -> u32 {
        self.num_vars
    }

    fn num_clauses(&self) -> u32 {
        self.num_clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustsat_batsat::BasicSolver;

    #[test]
    fn batsat_sat() {
        let mut solver = RustSatAdapter::new(BasicSolver::default());
        solver.add_variables(2);
        assert_eq!(solver.num_variables(), 2);

        solver.add_clause(&[1, 2]).unwrap();
        assert_eq!(solver.num_clauses(), 1);
        assert_eq!(solver.solve().unwrap(), SolveStatus::Sat);
    }

    #[test]
    fn batsat_unsat() {
        let mut solver = RustSatAdapter::new(BasicSolver::default());
        solver.add_variables(1);
        solver.add_clause(&[1]).unwrap();
        solver.add_clause(&[-1]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolveStatus::Unsat);
    }

    #[test]
    fn batsat_solution_values() {
        let mut solver = RustSatAdapter::new(BasicSolver::default());
        solver.add_variables(2);
        solver.add_clause(&[1]).unwrap();
        solver.add_clause(&[-2]).unwrap();

        assert_eq!(solver.solve().unwrap(), SolveStatus::Sat);
        assert!(solver.value_of(1));
        assert!(!solver.value_of(2));
        assert!(!solver.value_of(3));
    }

    #[test]
    fn zero_literal_is_rejected() {
        let mut solver = RustSatAdapter::new(BasicSolver::default());
        assert_eq!(solver.add_clause(&[0]), Err(SolverError::VariableLimit(0)));
    }

    #[test]
    fn stopped_batsat_is_interrupted() {
        let mut inner = BasicSolver::default();
        inner.batsat_mut().cb_mut().set_stop(|| true);
        let mut solver = RustSatAdapter::new(inner);
        solver.add_variables(2);
        solver.add_clause(&[1, 2]).unwrap();
        solver.add_clause(&[-1, 2]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolveStatus::Interrupted);
    }
}

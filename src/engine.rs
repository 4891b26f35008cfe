//! SAT solver trait, backends and budgeted solving

pub mod budget;
pub mod rustsat_adapter;

pub use budget::{Budget, CancellationToken};

use crate::cnf::CNF;
use crate::error::SolverError;
use rustsat_adapter::RustSatAdapter;
use rustsat_batsat::BasicSolver;
use std::thread;
use std::time::Instant;
use tracing::debug;

/// Core SAT solver trait
///
/// This trait defines the interface that all SAT solver backends must implement.
/// Variables are 1-indexed, and literals are represented as signed integers
/// (positive for true, negative for false).
pub trait SATSolver {
    /// Adds the given number of variables to the solver
    fn add_variables(&mut self, num_vars: u32);

    /// Adds a clause to the solver
    ///
    /// # Arguments
    /// * `lits` - Slice of literals (1-indexed, negated by sign)
    fn add_clause(&mut self, lits: &[i32]) -> Result<(), SolverError>;

    /// Solves the current formula
    fn solve(&mut self) -> Result<SolveStatus, SolverError>;

    /// Returns the assignment of a variable in the solution
    ///
    /// Only valid after solve() returns [`SolveStatus::Sat`].
    /// Variables are 1-indexed.
    fn value_of(&self, var: u32) -> bool;

    /// Returns the number of variables in the solver
    fn num_variables(&self) -> u32;

    /// Returns the number of clauses added
    fn num_clauses(&self) -> u32;
}

/// Answer of a single backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// A model was found
    Sat,
    /// The formula has no model
    Unsat,
    /// The backend stopped before deciding
    Interrupted,
}

/// Available SAT backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// batsat through rustsat
    #[default]
    Batsat,
}

impl Backend {
    /// Creates a fresh solver instance that stops once `budget` is exhausted
    ///
    /// The stop check runs inside the search loop, so an expired deadline or
    /// a cancelled token ends the call with [`SolveStatus::Interrupted`].
    pub fn create(self, budget: &Budget) -> Box<dyn SATSolver> {
        match self {
            Backend::Batsat => {
                let mut solver = BasicSolver::default();
                if !budget.is_unlimited() {
                    let budget = budget.clone();
                    solver
                        .batsat_mut()
                        .cb_mut()
                        .set_stop(move || budget.is_exhausted());
                }
                Box::new(RustSatAdapter::new(solver))
            }
        }
    }
}

/// Outcome of one SAT call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    /// Satisfiable; entry `i` is the value of variable `i + 1`
    Sat(Vec<bool>),
    /// Unsatisfiable
    Unsat,
    /// The budget ran out or the call was cancelled
    Timeout,
}

impl SatResult {
    /// True for [`SatResult::Sat`]
    pub fn is_sat(&self) -> bool {
        matches!(self, SatResult::Sat(_))
    }
}

/// Runs CNF problems on a backend under a [`Budget`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SolverAdapter {
    backend: Backend,
}

impl SolverAdapter {
    /// Creates an adapter for `backend`
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// The backend each call instantiates
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Solves `cnf` within `budget`
    ///
    /// A CNF without clauses is satisfied by the all-false model and one with
    /// the empty clause is unsatisfiable; neither reaches the backend. An
    /// unlimited budget solves on the calling thread. Otherwise a worker
    /// thread owns the solver, which watches the budget itself and gives up
    /// once it is exhausted; the caller always joins the worker before
    /// reporting [`SatResult::Timeout`].
    pub fn solve(&self, cnf: &CNF, budget: &Budget) -> Result<SatResult, SolverError> {
        if budget.is_exhausted() {
            debug!("budget exhausted before solving");
            return Ok(SatResult::Timeout);
        }
        if cnf.has_empty_clause() {
            return Ok(SatResult::Unsat);
        }
        if cnf.clauses.is_empty() {
            return Ok(SatResult::Sat(vec![false; cnf.num_variables as usize]));
        }

        if budget.is_unlimited() {
            let mut solver = self.backend.create(budget);
            return run(solver.as_mut(), cnf);
        }
        self.solve_on_worker(cnf, budget)
    }

    fn solve_on_worker(&self, cnf: &CNF, budget: &Budget) -> Result<SatResult, SolverError> {
        let backend = self.backend;
        let cnf = cnf.clone();
        let worker_budget = budget.clone();
        let start = Instant::now();
        // batsat callbacks are not Send, so the solver is built on the worker
        let handle = thread::Builder::new()
            .name("sat-worker".to_string())
            .spawn(move || {
                let mut solver = backend.create(&worker_budget);
                run(solver.as_mut(), &cnf)
            })
            .map_err(|e| SolverError::Backend(e.to_string()))?;

        let result = handle.join().map_err(|_| SolverError::WorkerLost)?;
        if let Ok(SatResult::Timeout) = result {
            debug!(
                waited_ms = start.elapsed().as_millis() as u64,
                "SAT worker stopped by budget"
            );
        }
        result
    }
}

/// Loads `cnf` into `solver` and reads back the model
fn run(solver: &mut dyn SATSolver, cnf: &CNF) -> Result<SatResult, SolverError> {
    solver.add_variables(cnf.num_variables);
    for clause in &cnf.clauses {
        solver.add_clause(clause)?;
    }
    let status = solver.solve()?;
    debug!(
        variables = solver.num_variables(),
        clauses = solver.num_clauses(),
        ?status,
        "SAT call finished"
    );
    match status {
        SolveStatus::Sat => {}
        SolveStatus::Unsat => return Ok(SatResult::Unsat),
        SolveStatus::Interrupted => return Ok(SatResult::Timeout),
    }
    let model = (1..=cnf.num_variables).map(|var| solver.value_of(var)).collect();
    Ok(SatResult::Sat(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cnf(num_variables: u32, clauses: &[&[i32]]) -> CNF {
        let mut cnf = CNF::new();
        for clause in clauses {
            cnf.add_clause(clause.to_vec());
        }
        cnf.num_variables = cnf.num_variables.max(num_variables);
        cnf
    }

    /// Pigeonhole principle: `holes + 1` pigeons do not fit into `holes` holes
    fn pigeonhole(holes: u32) -> CNF {
        let pigeons = holes + 1;
        let var = |p: u32, h: u32| (p * holes + h + 1) as i32;
        let mut problem = CNF::new();
        for p in 0..pigeons {
            problem.add_clause((0..holes).map(|h| var(p, h)).collect());
        }
        for h in 0..holes {
            for p in 0..pigeons {
                for q in (p + 1)..pigeons {
                    problem.add_clause(vec![-var(p, h), -var(q, h)]);
                }
            }
        }
        problem
    }

    #[test]
    fn inline_sat_returns_model() {
        let problem = cnf(2, &[&[1], &[-2]]);
        let result = SolverAdapter::default().solve(&problem, &Budget::unlimited()).unwrap();
        assert_eq!(result, SatResult::Sat(vec![true, false]));
    }

    #[test]
    fn inline_unsat() {
        let problem = cnf(1, &[&[1], &[-1]]);
        let result = SolverAdapter::default().solve(&problem, &Budget::unlimited()).unwrap();
        assert_eq!(result, SatResult::Unsat);
    }

    #[test]
    fn trivial_problems_skip_the_backend() {
        let adapter = SolverAdapter::default();
        let empty = cnf(3, &[]);
        assert_eq!(
            adapter.solve(&empty, &Budget::unlimited()).unwrap(),
            SatResult::Sat(vec![false; 3])
        );

        let contradiction = cnf(3, &[&[1, 2], &[]]);
        assert_eq!(
            adapter.solve(&contradiction, &Budget::unlimited()).unwrap(),
            SatResult::Unsat
        );
    }

    #[test]
    fn worker_reports_result_within_budget() {
        let problem = pigeonhole(3);
        let budget = Budget::with_limit(Duration::from_secs(30));
        let result = SolverAdapter::default().solve(&problem, &budget).unwrap();
        assert_eq!(result, SatResult::Unsat);
    }

    #[test]
    fn cancelled_budget_times_out() {
        let token = CancellationToken::new();
        token.cancel();
        let budget = Budget::unlimited().cancellable(Some(&token));
        let result = SolverAdapter::default().solve(&cnf(1, &[&[1]]), &budget).unwrap();
        assert_eq!(result, SatResult::Timeout);
    }

    #[test]
    fn hard_problem_times_out() {
        let problem = pigeonhole(11);
        let budget = Budget::with_limit(Duration::from_millis(20));
        let start = Instant::now();
        let result = SolverAdapter::default().solve(&problem, &budget).unwrap();
        assert_eq!(result, SatResult::Timeout);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn cancelling_stops_a_running_backend() {
        let token = CancellationToken::new();
        let budget = Budget::unlimited().cancellable(Some(&token));
        let mut solver = Backend::default().create(&budget);
        let problem = pigeonhole(11);
        solver.add_variables(problem.num_variables);
        for clause in &problem.clauses {
            solver.add_clause(clause).unwrap();
        }
        token.cancel();
        assert_eq!(solver.solve().unwrap(), SolveStatus::Interrupted);
    }

    #[test]
    fn backends_start_empty() {
        let solver = Backend::default().create(&Budget::unlimited());
        assert_eq!(solver.num_variables(), 0);
        assert_eq!(solver.num_clauses(), 0);
    }
}

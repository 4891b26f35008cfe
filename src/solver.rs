//! Main solver API
//!
//! The solver encodes a command's scope, translates the facts and the command
//! goal to a boolean circuit, converts the circuit to CNF and runs it on a SAT
//! backend under the configured time budget.

use crate::bool::Options as BoolOptions;
use crate::cnf::CNFTranslator;
use crate::encoder::{Encoder, Scope, DEFAULT_SCOPE};
use crate::engine::{Backend, Budget, CancellationToken, SatResult, SolverAdapter};
use crate::instance::Instance;
use crate::resolve::{ResolvedCommand, TypedModel};
use crate::translator::Translator;
use crate::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Solver options
#[derive(Debug, Clone)]
pub struct Options {
    /// Boolean circuit options
    pub bool_options: BoolOptions,
    /// SAT time budget in milliseconds (None = no timeout)
    ///
    /// Only the SAT call is budgeted; parsing and translation always finish.
    pub timeout_ms: Option<u64>,
    /// Require the atoms in use of each top-level signature to form a prefix
    ///
    /// Removes isomorphic instances only; never changes SAT/UNSAT.
    pub symmetry_breaking: bool,
    /// Scope used when neither the command nor the request gives one
    pub default_scope: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bool_options: BoolOptions::default(),
            timeout_ms: None,
            symmetry_breaking: true,
            default_scope: DEFAULT_SCOPE,
        }
    }
}

/// Main solver (uses batsat by default)
///
/// Finds instances of a typed model that satisfy one of its commands.
pub struct Solver {
    options: Options,
    backend: Backend,
}

impl Solver {
    /// Creates a new solver with the given options (uses batsat backend)
    pub fn new(options: Options) -> Self {
        Self::with_backend(options, Backend::default())
    }

    /// Creates a solver running on `backend`
    pub fn with_backend(options: Options, backend: Backend) -> Self {
        Self { options, backend }
    }

    /// The solver's options
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Solves `command` against the facts of `model`
    ///
    /// `scope_override` replaces the command's default scope. Returns a
    /// Solution indicating SAT/UNSAT/timeout and containing statistics and
    /// (if SAT) a satisfying instance.
    pub fn solve(
        &self,
        model: &TypedModel,
        command: &ResolvedCommand,
        scope_override: Option<u32>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Solution> {
        // Step 1: Bound every relation and build the structural constraints
        let translation_start = Instant::now();
        let scope = Scope::for_command(model, command, scope_override, self.options.default_scope);
        let encoding = Encoder::encode(model, &scope, &self.options)?;

        // Step 2: Translate facts and goal to a boolean circuit
        let mut formulas = model.facts.clone();
        formulas.push(command.goal);
        let interpreter = encoding.interpreter();
        let goal = Translator::compile(model, &formulas, interpreter)?;
        let factory = interpreter.factory();
        let root = factory.and(encoding.base_constraints(), goal);

        // Step 3: Convert boolean circuit to CNF
        let cnf = CNFTranslator::new(factory).translate(root);
        let translation_time = translation_start.elapsed();
        info!(
            command = %command.text,
            scope = scope.default_scope(),
            atoms = encoding.universe().size(),
            primary_variables = encoding.num_primary_variables(),
            variables = cnf.num_variables,
            clauses = cnf.num_clauses(),
            "command translated"
        );

        // Step 4: Run SAT solver
        let solving_start = Instant::now();
        let budget = Budget::from_millis(self.options.timeout_ms).cancellable(cancel);
        let result = SolverAdapter::new(self.backend).solve(&cnf, &budget)?;
        let solving_time = solving_start.elapsed();

        let stats = Statistics {
            scope: scope.default_scope(),
            translation_time,
            solving_time,
            num_primary_variables: encoding.num_primary_variables(),
            num_variables: cnf.num_variables,
            num_clauses: cnf.num_clauses() as u32,
        };
        debug!(?stats, sat = result.is_sat(), "command solved");

        match result {
            SatResult::Sat(assignment) => {
                let instance = encoding.decode(&assignment)?;
                Ok(Solution::Sat { instance, stats })
            }
            SatResult::Unsat => Ok(Solution::Unsat { stats }),
            SatResult::Timeout => Ok(Solution::Timeout { stats }),
        }
    }
}

/// Solution to a command
#[derive(Debug)]
pub enum Solution {
    /// Satisfiable - has an instance
    Sat {
        /// The satisfying instance
        instance: Instance,
        /// Solving statistics
        stats: Statistics,
    },
    /// Unsatisfiable within the scope
    Unsat {
        /// Solving statistics
        stats: Statistics,
    },
    /// The budget ran out or the request was cancelled
    Timeout {
        /// Solving statistics
        stats: Statistics,
    },
}

impl Solution {
    /// Returns true if the solution is satisfiable
    pub fn is_sat(&self) -> bool {
        matches!(self, Solution::Sat { .. })
    }

    /// Returns true if the solution is unsatisfiable
    pub fn is_unsat(&self) -> bool {
        matches!(self, Solution::Unsat { .. })
    }

    /// Returns true if the SAT call did not finish
    pub fn is_timeout(&self) -> bool {
        matches!(self, Solution::Timeout { .. })
    }

    /// Returns the instance if satisfiable
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Solution::Sat { instance, .. } => Some(instance),
            _ => None,
        }
    }

    /// Returns the statistics
    pub fn statistics(&self) -> &Statistics {
        match self {
            Solution::Sat { stats, .. } | Solution::Unsat { stats } | Solution::Timeout { stats } => stats,
        }
    }
}

/// Solver statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    scope: u32,
    translation_time: Duration,
    solving_time: Duration,
    num_primary_variables: u32,
    num_variables: u32,
    num_clauses: u32,
}

impl Statistics {
    /// Default scope the command ran with
    pub fn scope(&self) -> u32 {
        self.scope
    }

    /// Encoding, translation and CNF conversion time
    pub fn translation_time(&self) -> Duration {
        self.translation_time
    }

    /// SAT solving time
    pub fn solving_time(&self) -> Duration {
        self.solving_time
    }

    /// Variables standing for relation tuples
    pub fn num_primary_variables(&self) -> u32 {
        self.num_primary_variables
    }

    /// Primary plus auxiliary gate variables
    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    /// Number of clauses
    pub fn num_clauses(&self) -> u32 {
        self.num_clauses
    }
}

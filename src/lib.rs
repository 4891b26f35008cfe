//! # alloy-finder
//!
//! A bounded relational model finder for Alloy-style models.
//!
//! A model declares signatures (sets of atoms), fields (relations between
//! them), facts, predicates, assertions and `run`/`check` commands. Given a
//! scope, every relation is encoded as a matrix of boolean variables, the
//! facts are lowered to a boolean circuit, the circuit is converted to CNF and
//! handed to a SAT solver, and a satisfying assignment is decoded back into an
//! instance.
//!
//! ## Example
//!
//! ```rust,no_run
//! use alloy_finder::{analyze, AnalysisRequest, Status};
//!
//! let source = r#"
//!     sig Person { friends: set Person }
//!     fact { all p: Person | p not in p.friends }
//!     run {} for 3
//! "#;
//!
//! let result = analyze(&AnalysisRequest::new(source))?;
//! assert_eq!(result.status, Status::Sat);
//! println!("{}", result.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

/// Lexer, parser and surface syntax tree
pub mod syntax;

/// Name and type resolution into the typed model
pub mod resolve;

/// Typed, hash-consed expressions and formulas
pub mod ast;

/// Universe, tuples and decoded instances
pub mod instance;

/// Boolean circuit representation for translation
pub mod bool;

/// Bounded encoding of signatures and fields as boolean matrices
pub mod encoder;

/// Relational formula to boolean circuit translator
pub mod translator;

/// Boolean circuit to CNF conversion
pub mod cnf;

/// SAT backends, budgets and cancellation
pub mod engine;

/// Pipeline driver from typed model to solution
pub mod solver;

/// Serializable analysis results
pub mod format;

/// Error types
pub mod error {
    //! Error types for alloy-finder

    use thiserror::Error;

    /// Malformed model syntax
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("{line}:{column}: expected {expected}, found {found}")]
    pub struct ParseError {
        /// 1-based line of the offending token
        pub line: usize,
        /// 1-based column of the offending token
        pub column: usize,
        /// What the parser was looking for
        pub expected: String,
        /// The offending token text
        pub found: String,
    }

    /// A name that does not denote anything declared
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("{line}:{column}: cannot resolve `{name}`: {context}")]
    pub struct ResolutionError {
        /// The unresolved or conflicting name
        pub name: String,
        /// Where the name was used and why it failed
        pub context: String,
        /// 1-based line
        pub line: usize,
        /// 1-based column
        pub column: usize,
    }

    /// An ill-typed expression (arity or column type mismatch)
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("{line}:{column}: ill-typed `{expr}`: {reason}")]
    pub struct TypeError {
        /// Source text of the expression
        pub expr: String,
        /// Why the expression is ill-typed
        pub reason: String,
        /// 1-based line
        pub line: usize,
        /// 1-based column
        pub column: usize,
    }

    /// Failure of the SAT backend itself
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum SolverError {
        /// The backend rejected a clause or failed internally
        #[error("SAT backend failure: {0}")]
        Backend(String),

        /// A literal refers to a variable the backend cannot represent
        #[error("variable {0} exceeds the backend variable limit")]
        VariableLimit(u32),

        /// The worker thread ended without reporting a result
        #[error("SAT worker terminated without a result")]
        WorkerLost,
    }

    /// Errors that can occur during analysis
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum AlloyError {
        /// Malformed syntax
        #[error("parse error: {0}")]
        Parse(#[from] ParseError),

        /// Undeclared or conflicting names
        #[error("resolution error: {0}")]
        Resolution(#[from] ResolutionError),

        /// Arity or type mismatch
        #[error("type error: {0}")]
        Type(#[from] TypeError),

        /// Backend failure, not retried
        #[error("solver error: {0}")]
        Solver(#[from] SolverError),

        /// Invalid request argument
        #[error("invalid argument: {0}")]
        InvalidArgument(String),
    }

    impl AlloyError {
        /// Returns the source location of a user error
        pub fn location(&self) -> Option<(usize, usize)> {
            match self {
                AlloyError::Parse(e) => Some((e.line, e.column)),
                AlloyError::Resolution(e) => Some((e.line, e.column)),
                AlloyError::Type(e) => Some((e.line, e.column)),
                AlloyError::Solver(_) | AlloyError::InvalidArgument(_) => None,
            }
        }

        /// Returns true for errors the model author can fix in the source
        pub fn is_user_error(&self) -> bool {
            self.location().is_some()
        }
    }

    /// Result type for alloy-finder operations
    pub type Result<T> = std::result::Result<T, AlloyError>;
}

pub use engine::CancellationToken;
pub use error::{AlloyError, Result};
pub use format::{AnalysisResult, Status};
pub use solver::{Options, Solution, Solver};

use std::time::Instant;
use tracing::info;

/// Selects which command of a model to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSelector {
    /// Zero-based position among the model's commands
    Index(usize),
    /// Predicate or assertion name, or command label
    Name(String),
}

/// A single analysis request
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Model source text
    pub source: String,
    /// Replaces the default scope of the executed command
    pub scope_override: Option<u32>,
    /// Command to execute (default: the first one)
    pub command: Option<CommandSelector>,
    /// Solver options, including the time budget
    pub options: Options,
    /// Cooperative cancellation of the SAT call
    pub cancel: Option<CancellationToken>,
}

impl AnalysisRequest {
    /// Creates a request with default options
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Sets the scope override
    pub fn with_scope(mut self, scope: u32) -> Self {
        self.scope_override = Some(scope);
        self
    }

    /// Selects the command to execute
    pub fn with_command(mut self, command: CommandSelector) -> Self {
        self.command = Some(command);
        self
    }

    /// Sets the SAT time budget in milliseconds
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = Some(timeout_ms);
        self
    }

    /// Attaches a cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Parses, resolves, encodes and solves one command of a model.
///
/// Parse, resolution and type errors are reported as `PARSE_ERROR` /
/// `TYPE_ERROR` results carrying the error location. Only backend failures
/// and invalid request arguments are returned as `Err`.
pub fn analyze(request: &AnalysisRequest) -> Result<AnalysisResult> {
    let start = Instant::now();

    let model = match syntax::parse(&request.source)
        .map_err(AlloyError::from)
        .and_then(|module| resolve::resolve(&module))
    {
        Ok(model) => model,
        Err(err) if err.is_user_error() => {
            let result = format::user_error(&err, start.elapsed());
            info!(status = ?result.status, error = %err, "model rejected");
            return Ok(result);
        }
        Err(err) => return Err(err),
    };

    let command = model.select_command(request.command.as_ref())?;
    let solver = Solver::new(request.options.clone());
    let solution = solver.solve(&model, &command, request.scope_override, request.cancel.as_ref())?;

    let result = format::format(&model, &command, &solution, start.elapsed());
    info!(
        command = %command.text,
        status = ?result.status,
        elapsed_ms = result.elapsed_ms,
        "analysis finished"
    );
    Ok(result)
}

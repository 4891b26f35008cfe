//! Serializable analysis results
//!
//! Turns a [`Solution`] or a rejected model into an [`AnalysisResult`]. Atoms
//! are renamed after their most specific signature (`Sig$k`), signatures and
//! fields are listed in declaration order.

use crate::ast::{RelationId, SigId};
use crate::error::AlloyError;
use crate::instance::{Instance, TupleSet};
use crate::resolve::{ResolvedCommand, SigTable, TypedModel};
use crate::solver::{Solution, Statistics};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// An instance was found
    Sat,
    /// No instance exists within the scope
    Unsat,
    /// The time budget ran out or the request was cancelled
    Timeout,
    /// The source is not syntactically valid
    ParseError,
    /// A name does not resolve or an expression is ill-typed
    TypeError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Sat => "SAT",
            Status::Unsat => "UNSAT",
            Status::Timeout => "TIMEOUT",
            Status::ParseError => "PARSE_ERROR",
            Status::TypeError => "TYPE_ERROR",
        };
        f.write_str(name)
    }
}

/// Atoms of one signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAtoms {
    /// Signature name
    pub name: String,
    /// Display names of its atoms, including those of its subsignatures
    pub atoms: Vec<String>,
}

/// Tuples of one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTuples {
    /// `Owner.field`
    pub name: String,
    /// Display names of the atoms of each tuple
    pub tuples: Vec<Vec<String>>,
}

/// Location and message of a rejected model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    /// What went wrong
    pub message: String,
}

/// Size and timing of a solved command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Default scope of the run
    pub scope: u32,
    /// Variables standing for relation tuples
    pub primary_variables: u32,
    /// All CNF variables
    pub variables: u32,
    /// CNF clauses
    pub clauses: u32,
    /// Encoding and translation time
    pub translation_ms: u64,
    /// SAT time
    pub solving_ms: u64,
}

impl From<&Statistics> for Stats {
    fn from(stats: &Statistics) -> Self {
        Self {
            scope: stats.scope(),
            primary_variables: stats.num_primary_variables(),
            variables: stats.num_variables(),
            clauses: stats.num_clauses(),
            translation_ms: millis(stats.translation_time()),
            solving_ms: millis(stats.solving_time()),
        }
    }
}

/// The result of one analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Outcome
    pub status: Status,
    /// Source text of the executed command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Signatures in declaration order, empty unless SAT
    #[serde(default)]
    pub signatures: Vec<SignatureAtoms>,
    /// Fields in declaration order, empty unless SAT
    #[serde(default)]
    pub fields: Vec<FieldTuples>,
    /// Wall-clock time of the whole request
    pub elapsed_ms: u64,
    /// Location of a parse or type error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Translation and solving statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
}

impl AnalysisResult {
    /// Serializes the result as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serializes the result as indented JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Atoms of the signature called `name`
    pub fn atoms_of(&self, name: &str) -> Option<&[String]> {
        self.signatures
            .iter()
            .find(|sig| sig.name == name)
            .map(|sig| sig.atoms.as_slice())
    }

    /// Tuples of the field called `name` (`Owner.field`)
    pub fn tuples_of(&self, name: &str) -> Option<&[Vec<String>]> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.tuples.as_slice())
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(command) = &self.command {
            writeln!(f, "Command: {command}")?;
        }
        if let Some(stats) = &self.stats {
            writeln!(f, "Scope: {}", stats.scope)?;
        }
        writeln!(f, "Status: {}", self.status)?;

        if let Some(error) = &self.error {
            writeln!(f, "Error at {}:{}: {}", error.line, error.column, error.message)?;
        }
        if !self.signatures.is_empty() {
            writeln!(f, "Signatures:")?;
            for sig in &self.signatures {
                writeln!(f, "  {}: {{{}}}", sig.name, sig.atoms.join(", "))?;
            }
        }
        if !self.fields.is_empty() {
            writeln!(f, "Relations:")?;
            for field in &self.fields {
                let tuples: Vec<String> = field
                    .tuples
                    .iter()
                    .map(|tuple| format!("({})", tuple.join(", ")))
                    .collect();
                writeln!(f, "  {}: {{{}}}", field.name, tuples.join(", "))?;
            }
        }

        let satisfiable = match self.status {
            Status::Sat => "YES",
            Status::Unsat => "NO",
            _ => "UNKNOWN",
        };
        writeln!(f, "Satisfiable: {satisfiable}")?;
        if let Some(stats) = &self.stats {
            writeln!(
                f,
                "Variables: {} ({} primary), clauses: {}",
                stats.variables, stats.primary_variables, stats.clauses
            )?;
        }
        write!(f, "Time: {}ms", self.elapsed_ms)
    }
}

/// Formats the solution of `command`
pub fn format(
    model: &TypedModel,
    command: &ResolvedCommand,
    solution: &Solution,
    elapsed: Duration,
) -> AnalysisResult {
    let (status, signatures, fields) = match solution {
        Solution::Sat { instance, .. } => {
            let names = DisplayNames::new(&model.sigs, instance);
            (Status::Sat, names.signatures(&model.sigs, instance), names.fields(&model.sigs, instance))
        }
        Solution::Unsat { .. } => (Status::Unsat, Vec::new(), Vec::new()),
        Solution::Timeout { .. } => (Status::Timeout, Vec::new(), Vec::new()),
    };
    AnalysisResult {
        status,
        command: Some(command.text.clone()),
        signatures,
        fields,
        elapsed_ms: millis(elapsed),
        error: None,
        stats: Some(Stats::from(solution.statistics())),
    }
}

/// Formats a rejected model
///
/// Parse errors become `PARSE_ERROR`; resolution and type errors become
/// `TYPE_ERROR`. Errors without a source location are reported at 1:1.
pub fn user_error(err: &AlloyError, elapsed: Duration) -> AnalysisResult {
    let status = match err {
        AlloyError::Parse(_) => Status::ParseError,
        _ => Status::TypeError,
    };
    let message = match err {
        AlloyError::Parse(e) => format!("expected {}, found {}", e.expected, e.found),
        AlloyError::Resolution(e) => format!("cannot resolve `{}`: {}", e.name, e.context),
        AlloyError::Type(e) => format!("ill-typed `{}`: {}", e.expr, e.reason),
        other => other.to_string(),
    };
    let (line, column) = err.location().unwrap_or((1, 1));
    AnalysisResult {
        status,
        command: None,
        signatures: Vec::new(),
        fields: Vec::new(),
        elapsed_ms: millis(elapsed),
        error: Some(ErrorInfo { line, column, message }),
        stats: None,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Display name of every atom in use, by universe index
struct DisplayNames {
    names: Vec<Option<String>>,
}

impl DisplayNames {
    fn new(sigs: &SigTable, instance: &Instance) -> Self {
        let size = instance.universe().size();
        let mut names = vec![None; size];
        let mut counters = vec![0usize; sigs.num_sigs()];
        let contains = |sig: SigId, atom: usize| {
            instance
                .tuples(RelationId::Sig(sig))
                .is_some_and(|tuples| tuples.contains_index(atom))
        };

        for (atom, name) in names.iter_mut().enumerate() {
            let Some(mut owner) = sigs.top_level().into_iter().find(|&top| contains(top, atom)) else {
                continue;
            };
            while let Some(&child) = sigs.sig(owner).children.iter().find(|&&child| contains(child, atom)) {
                owner = child;
            }
            let k = &mut counters[owner.index()];
            *name = Some(format!("{}${}", sigs.sig(owner).name, k));
            *k += 1;
        }
        Self { names }
    }

    fn name(&self, atom: usize) -> String {
        self.names
            .get(atom)
            .and_then(Clone::clone)
            .unwrap_or_else(|| format!("atom${atom}"))
    }

    fn tuples(&self, tuples: &TupleSet) -> Vec<Vec<String>> {
        tuples
            .iter()
            .map(|tuple| tuple.atom_indices().iter().map(|&atom| self.name(atom)).collect())
            .collect()
    }

    fn signatures(&self, sigs: &SigTable, instance: &Instance) -> Vec<SignatureAtoms> {
        sigs.sig_ids()
            .map(|sig| SignatureAtoms {
                name: sigs.sig(sig).name.clone(),
                atoms: instance
                    .tuples(RelationId::Sig(sig))
                    .map(|tuples| tuples.indices().map(|atom| self.name(atom)).collect())
                    .unwrap_or_default(),
            })
            .collect()
    }

    fn fields(&self, sigs: &SigTable, instance: &Instance) -> Vec<FieldTuples> {
        sigs.field_ids()
            .map(|field| {
                let info = sigs.field(field);
                FieldTuples {
                    name: format!("{}.{}", sigs.sig(info.owner).name, info.name),
                    tuples: instance
                        .tuples(RelationId::Field(field))
                        .map(|tuples| self.tuples(tuples))
                        .unwrap_or_default(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, TypeError};
    use crate::solver::{Options, Solver};
    use crate::{resolve, syntax};

    fn run(source: &str) -> AnalysisResult {
        let model = resolve::resolve(&syntax::parse(source).unwrap()).unwrap();
        let command = model.select_command(None).unwrap();
        let solution = Solver::new(Options::default())
            .solve(&model, &command, None, None)
            .unwrap();
        format(&model, &command, &solution, Duration::from_millis(7))
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&Status::ParseError).unwrap(), "\"PARSE_ERROR\"");
        assert_eq!(serde_json::to_string(&Status::Sat).unwrap(), "\"SAT\"");
        assert_eq!(Status::TypeError.to_string(), "TYPE_ERROR");
    }

    #[test]
    fn atoms_are_named_after_most_specific_signature() {
        let result = run("abstract sig A {}
                          sig B extends A {}
                          sig C extends A {}
                          fact { #B = 1 }
                          fact { #C = 1 }
                          run {} for 2");
        assert_eq!(result.status, Status::Sat);
        assert_eq!(result.atoms_of("B"), Some(&["B$0".to_string()][..]));
        assert_eq!(result.atoms_of("C"), Some(&["C$0".to_string()][..]));

        let mut a = result.atoms_of("A").unwrap().to_vec();
        a.sort();
        assert_eq!(a, vec!["B$0", "C$0"]);
    }

    #[test]
    fn fields_are_qualified_by_owner() {
        let result = run("one sig A { r: set A } fact { some r } run {} for 1");
        assert_eq!(result.tuples_of("A.r"), Some(&[vec!["A$0".to_string(), "A$0".to_string()]][..]));
        assert_eq!(result.elapsed_ms, 7);
        assert_eq!(result.command.as_deref(), Some("run {} for 1"));
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let result = run("sig A {} run {} for 2");
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "SAT");
        assert_eq!(json["elapsedMs"], 7);
        assert_eq!(json["stats"]["primaryVariables"], 2);
        assert!(json.get("error").is_none());

        let back: AnalysisResult = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn unsat_has_no_instance() {
        let result = run("one sig A {} fact { #A = 2 } run {}");
        assert_eq!(result.status, Status::Unsat);
        assert!(result.signatures.is_empty());
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["signatures"], serde_json::json!([]));
        assert_eq!(json["fields"], serde_json::json!([]));
        assert!(result.to_text().contains("Satisfiable: NO"));
    }

    #[test]
    fn user_errors_carry_location() {
        let parse = AlloyError::Parse(ParseError {
            line: 2,
            column: 5,
            expected: "`}`".to_string(),
            found: "end of input".to_string(),
        });
        let result = user_error(&parse, Duration::ZERO);
        assert_eq!(result.status, Status::ParseError);
        assert_eq!(
            result.error,
            Some(ErrorInfo {
                line: 2,
                column: 5,
                message: "expected `}`, found end of input".to_string(),
            })
        );

        let ty = AlloyError::Type(TypeError {
            expr: "a.b".to_string(),
            reason: "join of incompatible columns".to_string(),
            line: 3,
            column: 1,
        });
        let result = user_error(&ty, Duration::ZERO);
        assert_eq!(result.status, Status::TypeError);
        assert!(result.to_text().contains("Error at 3:1"));
    }
}

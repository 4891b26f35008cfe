//! `check` commands and command selection

use alloy_finder::{analyze, AlloyError, AnalysisRequest, CommandSelector, Status};
use std::collections::BTreeSet;

const RELATIONS: &str = "
sig A { r: set A }
fact { all a: A | a not in a.r }
pred show { some r }
assert irreflexive { no iden & r }
assert symmetric { r = ~r }
check irreflexive for 3
check symmetric for 3
run show for 2
";

fn run_command(selector: CommandSelector) -> alloy_finder::AnalysisResult {
    analyze(&AnalysisRequest::new(RELATIONS).with_command(selector)).unwrap()
}

#[test]
fn valid_assertion_has_no_counterexample() {
    let result = run_command(CommandSelector::Name("irreflexive".to_string()));
    assert_eq!(result.status, Status::Unsat);
    assert_eq!(result.command.as_deref(), Some("check irreflexive for 3"));
}

#[test]
fn invalid_assertion_yields_counterexample() {
    let result = run_command(CommandSelector::Name("symmetric".to_string()));
    assert_eq!(result.status, Status::Sat);

    let r: BTreeSet<(String, String)> = result
        .tuples_of("A.r")
        .unwrap()
        .iter()
        .map(|t| (t[0].clone(), t[1].clone()))
        .collect();
    assert!(r.iter().any(|(a, b)| !r.contains(&(b.clone(), a.clone()))));
    assert!(r.iter().all(|(a, b)| a != b));
}

#[test]
fn first_command_is_the_default() {
    let result = analyze(&AnalysisRequest::new(RELATIONS)).unwrap();
    assert_eq!(result.status, Status::Unsat);
    assert_eq!(result.command.as_deref(), Some("check irreflexive for 3"));
}

#[test]
fn commands_are_selected_by_index() {
    let result = run_command(CommandSelector::Index(2));
    assert_eq!(result.status, Status::Sat);
    assert_eq!(result.command.as_deref(), Some("run show for 2"));
    assert!(!result.tuples_of("A.r").unwrap().is_empty());
}

#[test]
fn unknown_command_is_an_invalid_argument() {
    let err = analyze(&AnalysisRequest::new(RELATIONS).with_command(CommandSelector::Index(7))).unwrap_err();
    assert!(matches!(err, AlloyError::InvalidArgument(_)));

    let err = analyze(&AnalysisRequest::new(RELATIONS).with_command(CommandSelector::Name("nope".to_string())))
        .unwrap_err();
    assert!(matches!(err, AlloyError::InvalidArgument(_)));
}

#[test]
fn labelled_commands_are_selected_by_label() {
    let source = "sig A {}\nempty: run { no A } for 2\nfull: run { #A = 2 } for 2";
    let result = analyze(&AnalysisRequest::new(source).with_command(CommandSelector::Name("full".to_string()))).unwrap();
    assert_eq!(result.status, Status::Sat);
    assert_eq!(result.atoms_of("A").unwrap().len(), 2);
}

#[test]
fn predicate_parameters_are_quantified() {
    let source = "sig A {}\npred two[disj x, y: A] { some x and some y }\nrun two for 1";
    assert_eq!(analyze(&AnalysisRequest::new(source)).unwrap().status, Status::Unsat);

    let result = analyze(&AnalysisRequest::new(source).with_scope(2)).unwrap();
    assert_eq!(result.status, Status::Sat);
}

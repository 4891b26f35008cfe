//! Structural properties of found instances

use alloy_finder::ast::RelationId;
use alloy_finder::encoder::{Encoder, Scope};
use alloy_finder::instance::Instance;
use alloy_finder::solver::Options;
use alloy_finder::{analyze, resolve, syntax, AnalysisRequest, AnalysisResult, Status};
use std::collections::BTreeSet;

fn run(source: &str) -> AnalysisResult {
    analyze(&AnalysisRequest::new(source)).unwrap()
}

fn atom_set(result: &AnalysisResult, sig: &str) -> BTreeSet<String> {
    result.atoms_of(sig).unwrap().iter().cloned().collect()
}

#[test]
fn one_signatures_have_one_atom_each() {
    let result = run("one sig A {}\none sig B {}\none sig C {}\nrun {} for 4");
    assert_eq!(result.status, Status::Sat);
    for sig in ["A", "B", "C"] {
        assert_eq!(result.atoms_of(sig).unwrap(), &[format!("{sig}$0")]);
    }
}

#[test]
fn documented_models_analyze() {
    let result = run("/** doc */ sig A {} run {}");
    assert_eq!(result.status, Status::Sat);

    let source = "/* header\n * more\n */\nsig A {}\n/** the only fact\n ** is empty */\nfact {}\nrun {} for 2";
    let result = run(source);
    assert_eq!(result.status, Status::Sat);
    assert!(result.atoms_of("A").is_some());
}

#[test]
fn huge_cardinality_literals_are_cheap() {
    let start = std::time::Instant::now();
    assert_eq!(run("sig A {} fact { #A < 50000000 } run {} for 3").status, Status::Sat);
    assert_eq!(run("sig A {} fact { #A >= 50000000 } run {} for 3").status, Status::Unsat);
    assert!(start.elapsed() < std::time::Duration::from_secs(1));
}

#[test]
fn abstract_signature_is_partitioned_by_extensions() {
    let result = run("abstract sig A {}\nsig B extends A {}\nsig C extends A {}\nfact { some B and some C }\nrun {} for 3");
    assert_eq!(result.status, Status::Sat);
    let (a, b, c) = (atom_set(&result, "A"), atom_set(&result, "B"), atom_set(&result, "C"));
    assert!(b.is_disjoint(&c));
    assert_eq!(a, b.union(&c).cloned().collect());
}

#[test]
fn extensions_are_disjoint_subsets() {
    let result = run("sig A {}\nsig B extends A {}\nsig C extends A {}\nrun {} for 2");
    assert_eq!(result.status, Status::Sat);
    let (a, b, c) = (atom_set(&result, "A"), atom_set(&result, "B"), atom_set(&result, "C"));
    assert!(b.is_disjoint(&c));
    assert!(b.is_subset(&a));
    assert!(c.is_subset(&a));
}

#[test]
fn irreflexive_relation_over_two_atoms() {
    let result = run("sig A { r: set A }\nfact { all a: A | a not in a.r }\nrun {} for exactly 2 A");
    assert_eq!(result.status, Status::Sat);
    assert_eq!(result.atoms_of("A").unwrap().len(), 2);
    for tuple in result.tuples_of("A.r").unwrap() {
        assert_ne!(tuple[0], tuple[1]);
    }
}

#[test]
fn irreflexivity_rejects_forced_self_loop() {
    let result = run("one sig A { r: set A }\nfact { all a: A | a not in a.r }\nfact { some r }\nrun {} for 3");
    assert_eq!(result.status, Status::Unsat);
}

#[test]
fn one_signature_with_two_distinct_atoms_is_unsat() {
    let result = run("one sig A {}\nfact { some disj x, y: A | x != y }\nrun {} for 3");
    assert_eq!(result.status, Status::Unsat);
    assert!(result.error.is_none());
}

#[test]
fn closure_is_idempotent() {
    let result = run("sig A { r: set A }\nassert idem { ^(^r) = ^r }\ncheck idem for 3");
    assert_eq!(result.status, Status::Unsat);

    let result = run("sig A { r: set A }\nassert refl { *(*r) = *r }\ncheck refl for 3");
    assert_eq!(result.status, Status::Unsat);
}

#[test]
fn exact_scope_forces_atom_count() {
    let result = run("sig A {}\nrun {} for 4 but exactly 3 A");
    assert_eq!(result.status, Status::Sat);
    assert_eq!(result.atoms_of("A").unwrap().len(), 3);
}

#[test]
fn scope_override_applies() {
    let source = "sig A {}\nfact { #A = 5 }\nrun {} for 3";
    assert_eq!(run(source).status, Status::Unsat);
    let result = analyze(&AnalysisRequest::new(source).with_scope(5)).unwrap();
    assert_eq!(result.status, Status::Sat);
    assert_eq!(result.stats.unwrap().scope, 5);
}

#[test]
fn model_without_commands_runs_the_facts() {
    let result = run("sig A {}\nfact { some A }");
    assert_eq!(result.status, Status::Sat);
    assert_eq!(result.command.as_deref(), Some("run {}"));
    assert!(!result.atoms_of("A").unwrap().is_empty());
}

#[test]
fn encoding_decodes_hand_built_assignment() {
    let module = syntax::parse("sig A { r: set A }\nsig B {}").unwrap();
    let model = resolve::resolve(&module).unwrap();
    let scope = Scope::uniform(&model.sigs, 2);
    let encoding = Encoder::encode(&model, &scope, &Options::default()).unwrap();

    let a = model.sigs.lookup("A").unwrap();
    let b = model.sigs.lookup("B").unwrap();
    let r = model.sigs.field_named("r").unwrap();
    let factory = encoding.universe().factory();

    let mut instance = Instance::new(encoding.universe().clone());
    instance
        .add(RelationId::Sig(a), factory.tuple_set(1, &[&["A$0"], &["A$1"]]).unwrap())
        .unwrap();
    instance
        .add(RelationId::Sig(b), factory.tuple_set(1, &[&["B$1"]]).unwrap())
        .unwrap();
    instance
        .add(RelationId::Field(r), factory.tuple_set(2, &[&["A$0", "A$1"], &["A$1", "A$1"]]).unwrap())
        .unwrap();

    let decoded = encoding.decode(&encoding.assignment(&instance)).unwrap();
    for relation in [RelationId::Sig(a), RelationId::Sig(b), RelationId::Field(r)] {
        assert_eq!(decoded.tuples(relation), instance.tuples(relation));
    }
}

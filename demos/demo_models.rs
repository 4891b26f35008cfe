//! Runs the showcase models and prints their reports
//!
//! ```text
//! RUST_LOG=alloy_finder=debug cargo run --example demo_models
//! cargo run --example demo_models -- --json
//! ```

use alloy_finder::{analyze, AnalysisRequest};
use tracing_subscriber::EnvFilter;

const MODELS: &[(&str, &str)] = &[
    (
        "simple",
        "// Simple example
sig Person {
    friends: set Person
}

// Friendship is symmetric
fact SymmetricFriends {
    all p1, p2: Person | p1 in p2.friends implies p2 in p1.friends
}

// Nobody is their own friend
fact NoSelfFriendship {
    no p: Person | p in p.friends
}

run {} for 3",
    ),
    (
        "graph",
        "// Directed graph model
sig Node {
    edges: set Node
}

// No self-loops
fact NoSelfLoops {
    no n: Node | n in n.edges
}

// Graph is connected
pred connected {
    all n1, n2: Node | n1 in n2.*edges
}

run connected for 4",
    ),
    (
        "family",
        "// Family tree model
abstract sig Person {
    father: lone Man,
    mother: lone Woman
}

sig Man extends Person {}
sig Woman extends Person {}

// No one is their own ancestor
fact NoSelfAncestor {
    no p: Person | p in p.^(father + mother)
}

// Everyone has at most one father and one mother
fact UniqueParents {
    all p: Person | lone p.father and lone p.mother
}

run {} for 5",
    ),
    (
        "filesystem",
        "// File system model
abstract sig Object {
    parent: lone Dir
}

sig File extends Object {}

sig Dir extends Object {
    contents: set Object
}

// Root directory has no parent
one sig Root extends Dir {} {
    no parent
}

// Contents are children
fact ContentsAreChildren {
    all d: Dir, o: Object | o in d.contents iff d = o.parent
}

// No cycles in directory structure
fact NoCycles {
    no d: Dir | d in d.^parent
}

run {} for 4",
    ),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("alloy_finder=info")))
        .with_target(false)
        .init();

    let json = std::env::args().any(|arg| arg == "--json");
    for (name, source) in MODELS {
        let result = analyze(&AnalysisRequest::new(*source).with_timeout_ms(10_000))?;
        println!("=== {name} ===");
        if json {
            println!("{}", result.to_json_pretty()?);
        } else {
            println!("{}\n", result.to_text());
        }
    }
    Ok(())
}

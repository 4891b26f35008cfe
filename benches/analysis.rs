use alloy_finder::{analyze, resolve, syntax, AnalysisRequest};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const FRIENDS: &str = "
sig Person { friends: set Person }
fact { all p1, p2: Person | p1 in p2.friends implies p2 in p1.friends }
fact { no p: Person | p in p.friends }
run {} for 3
";

const GRAPH: &str = "
sig Node { edges: set Node }
fact { no n: Node | n in n.edges }
pred connected { all n1, n2: Node | n1 in n2.*edges }
run connected for 4
";

/// n+1 pigeons into n holes
fn pigeonhole(holes: u32) -> String {
    format!(
        "sig Pigeon {{ hole: one Hole }}\n\
         sig Hole {{}}\n\
         fact {{ all h: Hole | lone hole.h }}\n\
         run {{}} for {pigeons} but exactly {pigeons} Pigeon, exactly {holes} Hole",
        pigeons = holes + 1
    )
}

fn front_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("front_end");
    group.bench_function("parse_resolve_graph", |b| {
        b.iter(|| {
            let module = syntax::parse(black_box(GRAPH)).unwrap();
            resolve::resolve(&module).unwrap()
        });
    });
    group.finish();
}

fn analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    group.bench_function("friends_3", |b| {
        b.iter(|| analyze(&AnalysisRequest::new(black_box(FRIENDS))).unwrap());
    });
    group.bench_function("graph_4", |b| {
        b.iter(|| analyze(&AnalysisRequest::new(black_box(GRAPH))).unwrap());
    });
    for holes in [3, 4, 5] {
        let source = pigeonhole(holes);
        group.bench_function(format!("pigeonhole_{holes}"), |b| {
            b.iter(|| analyze(&AnalysisRequest::new(black_box(source.as_str()))).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, front_end, analysis);
criterion_main!(benches);

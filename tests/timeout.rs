//! Time budgets and cancellation

use alloy_finder::{analyze, AnalysisRequest, CancellationToken, Status};
use std::thread;
use std::time::{Duration, Instant};

/// Twelve pigeons, eleven holes
const PIGEONHOLE: &str = "
sig Pigeon { hole: one Hole }
sig Hole {}
fact { all h: Hole | lone hole.h }
run {} for 12 but exactly 12 Pigeon, exactly 11 Hole
";

#[test]
fn tiny_budget_on_hard_instance_times_out() {
    let start = Instant::now();
    let result = analyze(&AnalysisRequest::new(PIGEONHOLE).with_timeout_ms(50)).unwrap();
    assert_eq!(result.status, Status::Timeout);
    assert!(result.signatures.is_empty());
    assert!(result.stats.is_some());
    assert!(start.elapsed() < Duration::from_secs(60));
}

#[test]
fn pre_cancelled_token_times_out() {
    let token = CancellationToken::new();
    token.cancel();
    let request = AnalysisRequest::new("sig A { r: set A }\nfact { some r }\nrun {} for 3").with_cancellation(token);
    let result = analyze(&request).unwrap();
    assert_eq!(result.status, Status::Timeout);
}

#[test]
fn cancellation_from_another_thread() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let result = analyze(&AnalysisRequest::new(PIGEONHOLE).with_cancellation(token)).unwrap();
    handle.join().unwrap();
    assert_eq!(result.status, Status::Timeout);
}

#[test]
fn generous_budget_completes() {
    let source = "sig A { r: set A }\nfact { all a: A | one a.r }\nrun {} for 3";
    let result = analyze(&AnalysisRequest::new(source).with_timeout_ms(60_000)).unwrap();
    assert_eq!(result.status, Status::Sat);
}

#[test]
fn concurrent_requests_are_independent() {
    let handles: Vec<_> = (1..=4u32)
        .map(|n| {
            thread::spawn(move || {
                let source = format!("sig A {{}}\nfact {{ #A = {n} }}\nrun {{}} for 4");
                analyze(&AnalysisRequest::new(source)).unwrap()
            })
        })
        .collect();
    for (n, handle) in (1..=4usize).zip(handles) {
        let result = handle.join().unwrap();
        assert_eq!(result.status, Status::Sat);
        assert_eq!(result.atoms_of("A").unwrap().len(), n);
    }
}

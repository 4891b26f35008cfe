//! SAT worker threads do not outlive their analysis
//!
//! Kept in its own test binary so no other test spawns workers while the
//! thread list is inspected.

#![cfg(target_os = "linux")]

use alloy_finder::{analyze, AnalysisRequest, CancellationToken, Status};
use std::fs;
use std::thread;
use std::time::Duration;

const PIGEONHOLE: &str = "
sig Pigeon { hole: one Hole }
sig Hole {}
fact { all h: Hole | lone hole.h }
run {} for 12 but exactly 12 Pigeon, exactly 11 Hole
";

/// Threads of this process named `sat-worker`
fn live_sat_workers() -> usize {
    fs::read_dir("/proc/self/task")
        .unwrap()
        .filter_map(|entry| fs::read_to_string(entry.unwrap().path().join("comm")).ok())
        .filter(|name| name.trim() == "sat-worker")
        .count()
}

#[test]
fn timed_out_and_cancelled_workers_are_gone() {
    for _ in 0..3 {
        let result = analyze(&AnalysisRequest::new(PIGEONHOLE).with_timeout_ms(50)).unwrap();
        assert_eq!(result.status, Status::Timeout);
        assert_eq!(live_sat_workers(), 0);
    }

    let token = CancellationToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });
    let request = AnalysisRequest::new(PIGEONHOLE)
        .with_timeout_ms(60_000)
        .with_cancellation(token);
    let result = analyze(&request).unwrap();
    handle.join().unwrap();
    assert_eq!(result.status, Status::Timeout);
    assert_eq!(live_sat_workers(), 0);
}

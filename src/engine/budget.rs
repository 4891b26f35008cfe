//! Time budgets and cooperative cancellation of SAT calls

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A shared flag that asks a running analysis to stop
///
/// Clones share the flag; cancelling any clone cancels them all. Only the SAT
/// call observes it, and a cancelled call reports a timeout.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once any clone has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Limits on one SAT call
#[derive(Debug, Clone, Default)]
pub struct Budget {
    deadline: Option<Instant>,
    limit: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl Budget {
    /// No time limit and no cancellation
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A budget of `limit` starting now
    pub fn with_limit(limit: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + limit),
            limit: Some(limit),
            cancel: None,
        }
    }

    /// A budget of `timeout_ms` milliseconds if given, unlimited otherwise
    pub fn from_millis(timeout_ms: Option<u64>) -> Self {
        match timeout_ms {
            Some(ms) => Self::with_limit(Duration::from_millis(ms)),
            None => Self::unlimited(),
        }
    }

    /// Attaches a cancellation token
    pub fn cancellable(mut self, token: Option<&CancellationToken>) -> Self {
        self.cancel = token.cloned();
        self
    }

    /// True if neither a deadline nor a token constrains the call
    pub fn is_unlimited(&self) -> bool {
        self.deadline.is_none() && self.cancel.is_none()
    }

    /// The configured time limit
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// True once the deadline has passed or the token was cancelled
    pub fn is_exhausted(&self) -> bool {
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        expired || self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Time left before the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

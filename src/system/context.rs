// src/system/context.rs

use crate::CancellationToken;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why an execution context expired.
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The cancellation token was set.
    #[error("Operation was cancelled.")]
    Cancelled,
    /// The deadline passed.
    #[error("Deadline exceeded.")]
    DeadlineExceeded,
}

/// A cancellable deadline context.
///
/// Combines the caller's [`CancellationToken`] with an optional deadline. The first
/// expiry cause observed through [`ExecContext::err`] is latched, so every later
/// check of the same context reports the same cause.
#[derive(Debug, Clone)]
pub struct ExecContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    cause: Arc<OnceLock<Interruption>>,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::background()
    }
}

impl ExecContext {
    /// A context that never expires unless [`ExecContext::cancel`] is called on it.
    pub fn background() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }

    /// A context driven by an existing cancellation token.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            cause: Arc::new(OnceLock::new()),
        }
    }

    /// Derives a context that additionally expires after `timeout`.
    /// The earlier of the two deadlines wins. A timeout too large to be represented
    /// as an instant adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => {
                log::debug!("Timeout {:?} is out of range, ignoring it.", timeout);
                self.clone()
            }
        }
    }

    /// Derives a context that additionally expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            token: Arc::clone(&self.token),
            deadline: Some(deadline),
            cause: Arc::new(OnceLock::new()),
        }
    }

    /// Sets the shared cancellation token.
    pub fn cancel(&self) {
        self.token.store(true, Ordering::SeqCst);
    }

    /// The shared cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns the expiry cause, or `None` while the context is still live.
    pub fn err(&self) -> Option<Interruption> {
        if let Some(cause) = self.cause.get() {
            return Some(*cause);
        }

        let observed = if self.token.load(Ordering::SeqCst) {
            Interruption::Cancelled
        } else if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            Interruption::DeadlineExceeded
        } else {
            return None;
        };

        Some(*self.cause.get_or_init(|| observed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_context_is_live() {
        let ctx = ExecContext::background();
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.deadline(), None);
        assert_eq!(ctx.remaining(), None);
    }

    #[test]
    fn test_cancel_is_visible_through_derived_contexts() {
        let parent = ExecContext::background();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();

        assert_eq!(child.err(), Some(Interruption::Cancelled));
        assert_eq!(parent.err(), Some(Interruption::Cancelled));
    }

    #[test]
    fn test_expired_deadline_reports_deadline_exceeded() {
        let ctx = ExecContext::background().with_timeout(Duration::ZERO);
        assert_eq!(ctx.err(), Some(Interruption::DeadlineExceeded));
    }

    #[test]
    fn test_first_observed_cause_is_latched() {
        let ctx = ExecContext::background().with_timeout(Duration::ZERO);
        assert_eq!(ctx.err(), Some(Interruption::DeadlineExceeded));

        // A later cancellation does not rewrite history.
        ctx.cancel();
        assert_eq!(ctx.err(), Some(Interruption::DeadlineExceeded));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let outer = ExecContext::background().with_timeout(Duration::from_millis(10));
        let inner = outer.with_timeout(Duration::from_secs(3600));
        assert_eq!(inner.deadline(), outer.deadline());
    }

    #[test]
    fn test_unrepresentable_timeout_adds_no_deadline() {
        let ctx = ExecContext::background().with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
        assert_eq!(ctx.err(), None);

        let bounded = ExecContext::background().with_timeout(Duration::from_secs(60));
        let derived = bounded.with_timeout(Duration::MAX);
        assert_eq!(derived.deadline(), bounded.deadline());
    }
}

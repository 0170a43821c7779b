//! Per-call cancellation and deadlines.
//!
//! A `CallContext` travels with one operation. Transports check it before
//! sending, cap the request at the remaining time, and drop any response
//! that lands after the caller cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

/// Cancels every call made with the context it was taken from.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl CallContext {
    /// No deadline, never cancelled unless a handle is used.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails with `Cancelled` or `Timeout` when the call must not proceed.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(ApiError::Timeout),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_context_is_always_ready() {
        let ctx = CallContext::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn cancel_handle_cancels_clones() {
        let ctx = CallContext::with_timeout(Duration::from_secs(60));
        let shared = ctx.clone();
        ctx.cancel_handle().cancel();
        assert!(matches!(shared.check(), Err(ApiError::Cancelled)));
    }

    #[test]
    fn expired_deadline_times_out() {
        let ctx = CallContext::with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(ApiError::Timeout)));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn cancellation_wins_over_deadline() {
        let ctx = CallContext::with_deadline(Instant::now());
        ctx.cancel_handle().cancel();
        assert!(matches!(ctx.check(), Err(ApiError::Cancelled)));
    }
}

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Timeout Guard
// ============================================================================
//
// Races an operation, spawned on its own task, against a deadline timer.
// Whichever finishes first wins: the operation's own result is returned
// verbatim, or `Elapsed` if the deadline fires. A timed-out operation is
// abandoned, not aborted; it keeps running detached, so the wrapped future
// must be safe to outlive the guard (or be cancellation-aware itself).
//
// ============================================================================

#[derive(Debug)]
pub enum TimeoutResult<T, E> {
    /// Operation completed successfully within the deadline.
    Success(T),
    /// Operation completed with its own failure within the deadline.
    Failed(E),
    /// Deadline fired first; the operation is still running detached.
    Elapsed,
}

impl<T, E> TimeoutResult<T, E> {
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Self::Elapsed)
    }
}

/// Run an operation with a completion deadline.
pub async fn with_timeout<F, T, E>(limit: Duration, operation: F) -> TimeoutResult<T, E>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let mut handle = tokio::spawn(operation);

    tokio::select! {
        joined = &mut handle => match joined {
            Ok(Ok(value)) => TimeoutResult::Success(value),
            Ok(Err(error)) => TimeoutResult::Failed(error),
            // The task is never aborted, so a join error is a panic.
            Err(join_error) => std::panic::resume_unwind(join_error.into_panic()),
        },
        _ = sleep(limit) => TimeoutResult::Elapsed,
    }
}

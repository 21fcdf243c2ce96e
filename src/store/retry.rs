//! Bounded retry for serializable transactions.
//!
//! Under SERIALIZABLE isolation the database may abort a read that raced a
//! concurrent writer. Those aborts are transient and retried a fixed number of
//! times; every other outcome, not-found included, is returned immediately.

use std::future::Future;

use super::StoreError;

/// How many times a serializable operation is attempted in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Whether an error belongs to the class that is worth retrying.
pub fn is_retryable(err: &StoreError) -> bool {
    matches!(err, StoreError::SerializationConflict)
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. Each call of `attempt` must open and finish
/// its own transaction.
pub async fn with_serialization_retry<T, F, Fut>(
    policy: RetryPolicy,
    op: &'static str,
    mut attempt: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut tries = 0;

    loop {
        tries += 1;
        match attempt().await {
            Err(err) if is_retryable(&err) && tries < max_attempts => {
                tracing::debug!(op = op, attempt = tries, "Serialization conflict, retrying");
            }
            Err(err) if is_retryable(&err) => {
                tracing::warn!(op = op, attempts = tries, "Serialization retries exhausted");
                return Err(err);
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Entity;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = with_serialization_retry(RetryPolicy::default(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, StoreError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_conflicts_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = with_serialization_retry(RetryPolicy::new(3), "test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(StoreError::SerializationConflict)
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = with_serialization_retry(RetryPolicy::new(3), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::SerializationConflict)
        })
        .await;

        assert!(matches!(result, Err(StoreError::SerializationConflict)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = with_serialization_retry(RetryPolicy::new(3), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::NotFound(Entity::User))
        })
        .await;

        assert!(matches!(result, Err(StoreError::NotFound(Entity::User))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = with_serialization_retry(RetryPolicy::new(5), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        })
        .await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }
}

//! Retry-on-lock discipline for the single-writer SQLite store.
//!
//! Every repository write goes through [`execute_with_retry`] so lock
//! contention handling lives in one place instead of being repeated at each
//! call site.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::pool::DieselError;

/// Backoff policy for lock-contention retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before the write is abandoned.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 1.5,
        }
    }
}

impl RetryPolicy {
    /// A policy with near-zero delays, for tests.
    #[allow(dead_code)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
        }
    }
}

/// Whether an error is SQLite lock contention worth retrying.
///
/// Uniqueness violations and other constraint errors are never retried; they
/// are classified by the caller instead.
pub fn is_lock_contention(err: &DieselError) -> bool {
    if let DieselError::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _) = err {
        return false;
    }
    err.to_string().to_lowercase().contains("locked")
}

/// Run a database operation, retrying on lock contention with multiplicative
/// backoff. Non-retryable errors and exhausted retries return the last error;
/// the caller decides how to log the abandoned write.
pub async fn execute_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, DieselError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DieselError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_lock_contention(&e) => {
                warn!(
                    "database locked (attempt {}/{}), retrying in {:?}",
                    attempt, policy.max_attempts, delay
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_factor);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::pool::to_diesel_error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn lock_error() -> DieselError {
        to_diesel_error("database is locked")
    }

    #[tokio::test]
    async fn succeeds_after_four_lock_errors() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(5);

        let result = execute_with_retry(&policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 4 {
                    Err(lock_error())
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(5);

        let result: Result<(), _> = execute_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(lock_error()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn does_not_retry_unique_violations() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(5);

        let result: Result<(), _> = execute_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(DieselError::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    Box::new(crate::repository::pool::DbErrorInfo(
                        "UNIQUE constraint failed: articles.url (database table is locked)"
                            .to_string(),
                    )),
                ))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

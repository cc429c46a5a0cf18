use crate::error::{ChatError, Result};
use std::future::Future;

/// How many times a provider call may be attempted. Only transport failures
/// (see `ChatError::is_transport`) are retried, immediately and without backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

/// The last error once the policy gave up.
#[derive(Debug)]
pub struct Exhausted {
    pub error: ChatError,
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_retry()
    }
}

impl RetryPolicy {
    pub const fn single_retry() -> Self {
        Self { max_attempts: 2 }
    }

    pub const fn no_retry() -> Self {
        Self { max_attempts: 1 }
    }

    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> std::result::Result<T, Exhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transport() && attempt < self.max_attempts => {
                    tracing::warn!(call = label, attempt, error = %error, "transport failure, retrying");
                }
                Err(error) => {
                    return Err(Exhausted {
                        error,
                        attempts: attempt,
                    })
                }
            }
        }
    }
}

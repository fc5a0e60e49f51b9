use crate::error::{AppError, Result};
use std::future::Future;

/// Bounded retry without backoff: every attempt redoes the whole run from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Calls `op` with the 1-based attempt number until it succeeds or the budget runs
    /// out. Errors are logged and swallowed; the outcome says which way it ended.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut remaining = self.max_attempts;
        let mut attempt = 0;
        let mut last_error = None;

        while remaining > 0 {
            remaining -= 1;
            attempt += 1;
            tracing::info!("Attempt {}/{}", attempt, self.max_attempts);

            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    }
                }
                Err(e) => {
                    tracing::error!("Attempt {} failed: {}", attempt, e);
                    match &e {
                        e if e.is_timeout() => {
                            tracing::warn!("TIMEOUT, will try again ({} attempts left)", remaining)
                        }
                        AppError::EmptyExtraction(_) => tracing::warn!(
                            "No archetypes matched, will try again ({} attempts left)",
                            remaining
                        ),
                        _ => {}
                    }
                    last_error = Some(e.to_string());
                }
            }
        }

        tracing::warn!("Giving up after {} attempts", attempt);
        RetryOutcome::Exhausted {
            attempts: attempt,
            last_error,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: Option<String> },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

/// One end-to-end scrape plus the resource it holds across attempts.
#[allow(async_fn_in_trait)]
pub trait Pipeline {
    type Output;

    async fn run_once(&self, attempt: u32) -> Result<Self::Output>;

    async fn release(&mut self) -> Result<()>;
}

/// Runs `pipeline` under `policy`, then releases it whatever the outcome. A failing
/// release is logged, not returned.
pub async fn run_with_retries<P: Pipeline>(
    policy: &RetryPolicy,
    pipeline: &mut P,
) -> RetryOutcome<P::Output> {
    let outcome = {
        let shared: &P = pipeline;
        policy.run(move |attempt| shared.run_once(attempt)).await
    };

    if let Err(e) = pipeline.release().await {
        tracing::warn!("Failed to release browser: {}", e);
    }

    outcome
}

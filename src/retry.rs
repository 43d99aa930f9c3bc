//! Bounded retry with a fixed delay.
//!
//! Only transient failures ([`OrcaError::is_transient`]) are retried. Once
//! the budget is spent the configured [`ExhaustionPolicy`] decides whether
//! the caller sees a degradable [`Outcome::Exhausted`] or a hard
//! [`OrcaError::RetriesExhausted`].

use std::time::Duration;

use crate::config::{ExhaustionPolicy, RetryConfig};
use crate::error::{OrcaError, Result};

/// Result of a retried operation that did not hard-fail.
#[derive(Debug)]
pub enum Outcome<T> {
    Completed { value: T, attempts: u32 },
    /// Only returned under [`ExhaustionPolicy::Skip`].
    Exhausted { attempts: u32, last_error: OrcaError },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub on_exhausted: ExhaustionPolicy,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_seconds: f64, on_exhausted: ExhaustionPolicy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::from_secs_f64(delay_seconds.max(0.0)),
            on_exhausted,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.delay_seconds,
            config.on_exhausted,
        )
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// `op` receives the 1-based attempt number. The delay is slept between
    /// attempts, never after the last one.
    pub fn run<T, F>(&self, mut op: F) -> Result<Outcome<T>>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt) {
                Ok(value) => {
                    return Ok(Outcome::Completed {
                        value,
                        attempts: attempt,
                    })
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::error!(
                        attempt,
                        max_attempts = self.max_attempts,
                        status = ?e.status(),
                        error = %e,
                        "retries exhausted"
                    );
                    return match self.on_exhausted {
                        ExhaustionPolicy::Skip => Ok(Outcome::Exhausted {
                            attempts: attempt,
                            last_error: e,
                        }),
                        ExhaustionPolicy::Abort => Err(OrcaError::RetriesExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        }),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        status = ?e.status(),
                        error = %e,
                        "attempt failed; retrying in {:.1}s",
                        self.delay.as_secs_f64()
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
            }
        }
    }
}

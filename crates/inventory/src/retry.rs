//! Retry policy for inventory calls.
//!
//! Transient failures are retried with exponential backoff and jitter, bounded
//! by both an attempt limit and the caller's context deadline.

use std::future::Future;
use std::time::Duration;

use common::SubmitContext;
use rand::Rng;

use crate::InventoryError;

/// Configuration for retrying transient inventory failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first. Never less than 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Random spread applied to each delay, as a fraction (0.25 = ±25%).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt limit and delays.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Returns the policy with jitter disabled.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Delay after the given failed attempt (1-based), before jitter.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Delay after the given failed attempt (1-based), with jitter applied.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt).as_secs_f64();
        if self.jitter <= 0.0 {
            return Duration::from_secs_f64(nominal);
        }

        let spread = rand::rng().random_range(-1.0..=1.0) * self.jitter;
        let delay = (nominal * (1.0 + spread)).clamp(0.0, self.max_delay.as_secs_f64());
        Duration::from_secs_f64(delay)
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry
    /// budget is spent.
    ///
    /// `attempt` receives the time left before the context deadline so it can
    /// bound its own RPC. Cancellation interrupts both in-flight attempts and
    /// backoff sleeps.
    pub async fn run<T, F, Fut>(
        &self,
        ctx: &SubmitContext,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, InventoryError>
    where
        F: FnMut(Option<Duration>) -> Fut,
        Fut: Future<Output = Result<T, InventoryError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            ctx.check()
                .map_err(|e| InventoryError::from_context(e, attempts))?;

            attempts += 1;
            metrics::counter!("inventory_rpc_attempts_total", "operation" => operation)
                .increment(1);

            let err = match ctx.run(attempt(ctx.remaining())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_transient() => e,
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(InventoryError::from_context(e, attempts)),
            };

            if attempts >= max_attempts {
                return Err(InventoryError::Exhausted {
                    attempts,
                    reason: err.to_string(),
                });
            }

            let delay = self.backoff(attempts);
            if let Some(remaining) = ctx.remaining()
                && remaining <= delay
            {
                return Err(InventoryError::Exhausted {
                    attempts,
                    reason: format!("deadline leaves no time to retry: {err}"),
                });
            }

            tracing::warn!(
                operation,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient inventory failure, retrying"
            );
            metrics::counter!("inventory_rpc_retries_total", "operation" => operation)
                .increment(1);

            ctx.run(tokio::time::sleep(delay))
                .await
                .map_err(|e| InventoryError::from_context(e, attempts))?;
        }
    }
}

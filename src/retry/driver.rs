//! The attempt/delay state machine.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::retry::error::panic_message;
use crate::retry::policy::{AttemptBudget, NextDelay, Schedule};
use crate::retry::settings::Operation;
use crate::retry::status::RetryStatus;

/// Runs one retry cycle to completion.
///
/// Attempts run strictly one after another: either an attempt is in flight or
/// a delay timer is pending, never both. All status mutation goes through the
/// status handle's transitions.
pub(crate) struct Driver<T, E> {
    operation: Operation<T, E>,
    status: RetryStatus<T, E>,
    budget: AttemptBudget,
    schedule: Schedule<T, E>,
}

impl<T, E> Driver<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(operation: Operation<T, E>, status: RetryStatus<T, E>) -> Self {
        let budget = status.policy().budget();
        let schedule = status.policy().schedule();
        Self {
            operation,
            status,
            budget,
            schedule,
        }
    }

    /// Drive the cycle, settling the completion signal exactly once even if
    /// caller code panics.
    pub(crate) async fn run(self) {
        let status = self.status.clone();
        if let Err(payload) = AssertUnwindSafe(self.cycle()).catch_unwind().await {
            let message = panic_message(payload.as_ref());
            #[cfg(feature = "tracing")]
            tracing::warn!(attempt = status.attempt(), "retry abandoned after panic: {}", message);
            status.abandon(message);
        }
    }

    async fn cycle(mut self) {
        let mut next = NextDelay::from(self.status.policy().initial_delay());

        loop {
            self.budget.consume();
            if let NextDelay::After(delay) = next {
                if !self.status.arm_timer() {
                    break;
                }
                #[cfg(feature = "tracing")]
                tracing::debug!(delay_ms = delay.as_millis() as u64, "waiting before attempt");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.status.timer_cancelled() => {}
                }
            }

            let Some(attempt) = self.status.begin_attempt() else {
                break;
            };
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, "starting attempt");
            #[cfg(not(feature = "tracing"))]
            let _ = attempt;

            let outcome = (self.operation)(&self.status).settle().await;
            let stopped = self.status.record(outcome.clone());
            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt,
                outcome = if outcome.is_ok() { "value" } else { "error" },
                "attempt settled"
            );

            if !self.should_continue(&outcome, stopped) {
                break;
            }

            next = match self.schedule.next_delay() {
                Some(delay) => delay.resolve(&self.status),
                None => NextDelay::Immediately,
            };
            match next {
                NextDelay::Abort => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, "delay function aborted the cycle");
                    break;
                }
                // Immediate retries still yield to the runtime.
                NextDelay::Immediately => tokio::task::yield_now().await,
                NextDelay::After(_) => {}
            }
        }

        self.status.finish();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempts = self.status.attempt(),
            failed = self.status.is_error(),
            "retry finished"
        );
    }

    fn should_continue(&self, outcome: &Result<T, E>, stopped: bool) -> bool {
        if stopped || self.budget.is_exhausted() {
            return false;
        }

        let policy = self.status.policy();
        let proceed = match outcome {
            Ok(value) => policy.retry_test().decide(value, &self.status),
            Err(error) => policy.retry_on_error().decide(error, &self.status),
        };

        match policy.time_limit() {
            Some(limit) if proceed && self.status.elapsed() > limit => {
                #[cfg(feature = "tracing")]
                tracing::debug!(limit_ms = limit.as_millis() as u64, "time limit reached");
                false
            }
            _ => proceed,
        }
    }
}

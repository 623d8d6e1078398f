use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::game_api::{ActionError, ActionReport};
use super::tools::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Fixed wait before reissuing a call the bank rejected as contended.
    pub contention_backoff_ms: u64,
    /// Contended attempts tolerated before the call is given up as a failed step.
    pub max_contention_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            contention_backoff_ms: 500,
            max_contention_retries: 20,
        }
    }
}

impl RetryPolicy {
    pub fn contention_backoff(&self) -> Duration {
        Duration::from_millis(self.contention_backoff_ms)
    }
}

/// Issues remote calls for one character and absorbs the transient conditions.
///
/// The retry loop never abandons a call that is in flight: cancellation is only observed
/// before an attempt and while sleeping.
#[derive(Debug, Clone)]
pub struct Executor {
    pub retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(retry: RetryPolicy, cancel: CancellationToken) -> Self {
        Self { retry, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleeps for `duration`, waking early with [`ActionError::Cancelled`] on cancellation.
    pub async fn pause(&self, duration: Duration) -> Result<(), ActionError> {
        if self.cancel.is_cancelled() {
            return Err(ActionError::Cancelled);
        }
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ActionError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Runs `call` until it succeeds or fails with a non-transient condition.
    ///
    /// `InCooldown` sleeps exactly the reported remainder. `TransactionInProgress` on a bank
    /// action sleeps the fixed contention backoff. Both reissue the identical call.
    pub async fn perform<T, F, Fut>(
        &self,
        character: &str,
        action: ActionKind,
        mut call: F,
    ) -> Result<ActionReport<T>, ActionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ActionReport<T>, ActionError>>,
    {
        let mut contended = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(ActionError::Cancelled);
            }

            match call().await {
                Ok(report) => return Ok(report),
                Err(ActionError::InCooldown { remaining }) => {
                    tracing::info!(
                        character,
                        action = %action,
                        wait_ms = remaining.as_millis() as u64,
                        "executor.retry.cooldown"
                    );
                    self.pause(remaining).await?;
                }
                Err(ActionError::TransactionInProgress) if action.touches_shared_resource() => {
                    contended += 1;
                    if contended > self.retry.max_contention_retries {
                        tracing::warn!(
                            character,
                            action = %action,
                            attempts = contended,
                            "executor.retry.contention_exhausted"
                        );
                        return Err(ActionError::TransactionInProgress);
                    }
                    tracing::info!(
                        character,
                        action = %action,
                        attempt = contended,
                        "executor.retry.contention"
                    );
                    self.pause(self.retry.contention_backoff()).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

//! Execution of a single fetch task with retries.
//!
//! A [`FetchWorker`] turns one [`FetchTask`] into one [`FetchOutcome`]. Every
//! attempt builds a fresh client through the [`RendererFactory`], loads the
//! URL under a timeout, runs the auxiliary overlay step, and disposes the
//! client before anything else happens, whether the attempt worked or not.
//!
//! # Cancellation
//!
//! The worker checks the batch [`CancellationToken`] before every attempt and
//! while backing off. An attempt that is already running is never
//! interrupted; it finishes and tears its client down, and the task then ends
//! without retrying.
//!
//! # Panics
//!
//! A renderer that panics mid-attempt ends the task with a fatal failure that
//! counts the panicking attempt. The client guard still disposes the client
//! while the panic unwinds.

use crate::error::FetchError;
use crate::models::{FetchFailure, FetchOutcome, FetchTask, TaskState};
use crate::renderer::{ClientGuard, PageRenderer, RendererFactory};
use crate::retry::RetryPolicy;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_OVERLAY_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-attempt time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTimeouts {
    /// Upper bound for one `load()` call.
    pub load: Duration,
    /// Upper bound for the auxiliary accept/dismiss step.
    pub overlay: Duration,
}

impl Default for AttemptTimeouts {
    fn default() -> Self {
        Self {
            load: DEFAULT_ATTEMPT_TIMEOUT,
            overlay: DEFAULT_OVERLAY_TIMEOUT,
        }
    }
}

/// Runs fetch tasks to a terminal outcome.
pub struct FetchWorker<F: RendererFactory> {
    factory: Arc<F>,
    policy: RetryPolicy,
    timeouts: AttemptTimeouts,
    cancellation: CancellationToken,
}

impl<F: RendererFactory> FetchWorker<F> {
    pub fn new(
        factory: Arc<F>,
        policy: RetryPolicy,
        timeouts: AttemptTimeouts,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            factory,
            policy,
            timeouts,
            cancellation,
        }
    }

    /// Attempt `task` until it succeeds, fails fatally, runs out of attempts,
    /// or the batch is cancelled.
    #[instrument(level = "info", skip_all, fields(url = %task.url()))]
    pub async fn execute(&self, task: FetchTask) -> FetchOutcome {
        let t0 = Instant::now();
        let mut attempt: u32 = 1;

        loop {
            if self.cancellation.is_cancelled() {
                debug!(attempt, "Batch cancelled before attempt");
                return FetchOutcome::Failure(FetchFailure {
                    url: task.into_url(),
                    last_error: FetchError::Cancelled,
                    attempts: attempt - 1,
                });
            }

            debug!(attempt, state = ?TaskState::Attempting, "Trying to fetch page");
            let result = match AssertUnwindSafe(self.attempt(task.url())).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    warn!(attempt, %reason, "Renderer panicked during attempt");
                    return FetchOutcome::Failure(FetchFailure {
                        url: task.into_url(),
                        last_error: FetchError::fatal(format!("worker panicked: {reason}")),
                        attempts: attempt,
                    });
                }
            };
            let err = match result {
                Ok(content) => {
                    info!(
                        attempt,
                        bytes = content.len(),
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        state = ?TaskState::Succeeded,
                        "Fetched page"
                    );
                    return FetchOutcome::Success {
                        url: task.into_url(),
                        content,
                    };
                }
                Err(err) => err,
            };

            if !err.is_retryable() || !self.policy.should_retry(attempt) {
                warn!(
                    attempt,
                    max = self.policy.max_attempts(),
                    retryable = err.is_retryable(),
                    error = %err,
                    state = ?TaskState::PermanentlyFailed,
                    "Giving up on page"
                );
                return FetchOutcome::Failure(FetchFailure {
                    url: task.into_url(),
                    last_error: err,
                    attempts: attempt,
                });
            }

            let delay = self.policy.delay_before_attempt(attempt);
            warn!(
                attempt,
                max = self.policy.max_attempts(),
                ?delay,
                error = %err,
                state = ?TaskState::Retrying,
                "Fetch attempt failed; backing off"
            );

            if !sleep_unless_cancelled(delay, &self.cancellation).await {
                debug!(attempt, "Batch cancelled during backoff");
                return FetchOutcome::Failure(FetchFailure {
                    url: task.into_url(),
                    last_error: err,
                    attempts: attempt,
                });
            }
            attempt += 1;
        }
    }

    /// One attempt: create, load, dismiss overlays, dispose.
    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let renderer = self.factory.create().await?;
        let mut client = ClientGuard::new(renderer);

        let content = match timeout(self.timeouts.load, client.load(url)).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout(self.timeouts.load)),
        };

        match timeout(self.timeouts.overlay, client.accept_overlays()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%url, error = %e, "Failed to dismiss page overlays"),
            Err(_) => warn!(
                %url,
                timeout = ?self.timeouts.overlay,
                "Timeout occurred while dismissing page overlays"
            ),
        }

        Ok(content)
    }
}

/// Sleep for `delay`; returns `false` if the token fired first.
async fn sleep_unless_cancelled(delay: Duration, token: &CancellationToken) -> bool {
    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !token.is_cancelled();
    }
    tokio::select! {
        _ = token.cancelled() => false,
        _ = sleep(delay) => true,
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

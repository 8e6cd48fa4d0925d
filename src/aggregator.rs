//! Bounded, fault-tolerant fan-out of fetch tasks.
//!
//! [`FetchAggregator::fetch_all`] deduplicates a batch of URLs and drives one
//! [`FetchWorker`] task per URL through a fixed number of pool slots. Each
//! admitted task is spawned on the runtime, so slots run in parallel; a new
//! task is admitted only when a slot frees up.
//!
//! # Guarantees
//!
//! - Every unique URL ends up in exactly one of `results` or `failures`
//! - At most `pool_size` clients are alive at any moment
//! - One failing URL never aborts the rest of the batch
//! - Cancellation drains: queued URLs are reported as cancelled, running
//!   attempts finish and dispose their client, and the call returns

use crate::config::FetchConfig;
use crate::error::{ConfigError, FetchError};
use crate::models::{FetchFailure, FetchTask, TaskState};
use crate::renderer::RendererFactory;
use crate::retry::RetryPolicy;
use crate::store::{FetchReport, ResultStore};
use crate::worker::{AttemptTimeouts, FetchWorker, panic_message};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

pub const DEFAULT_POOL_SIZE: usize = 5;

/// Fetches batches of URLs through a bounded pool of workers.
pub struct FetchAggregator<F: RendererFactory> {
    factory: Arc<F>,
    pool_size: NonZeroUsize,
    policy: RetryPolicy,
    timeouts: AttemptTimeouts,
    batch_timeout: Option<Duration>,
    span: Span,
}

impl<F: RendererFactory> FetchAggregator<F> {
    /// Build an aggregator, rejecting a pool size of zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPoolSize`] when `pool_size` is zero.
    pub fn new(factory: F, pool_size: usize, policy: RetryPolicy) -> Result<Self, ConfigError> {
        let pool_size =
            NonZeroUsize::new(pool_size).ok_or(ConfigError::InvalidPoolSize(pool_size))?;
        Ok(Self {
            factory: Arc::new(factory),
            pool_size,
            policy,
            timeouts: AttemptTimeouts::default(),
            batch_timeout: None,
            span: Span::none(),
        })
    }

    /// Pool of 5, 3 attempts, 2s linear backoff.
    pub fn with_defaults(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            pool_size: NonZeroUsize::new(DEFAULT_POOL_SIZE).unwrap_or(NonZeroUsize::MIN),
            policy: RetryPolicy::default(),
            timeouts: AttemptTimeouts::default(),
            batch_timeout: None,
            span: Span::none(),
        }
    }

    pub fn from_config(factory: F, config: &FetchConfig) -> Result<Self, ConfigError> {
        let aggregator = Self::new(factory, config.pool_size, config.retry_policy()?)?
            .with_timeouts(config.attempt_timeouts());
        Ok(match config.batch_timeout() {
            Some(limit) => aggregator.with_batch_timeout(limit),
            None => aggregator,
        })
    }

    pub fn with_timeouts(mut self, timeouts: AttemptTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Cancel the batch once `limit` has elapsed, draining like a user cancel.
    pub fn with_batch_timeout(mut self, limit: Duration) -> Self {
        self.batch_timeout = Some(limit);
        self
    }

    /// Parent span for every worker event emitted by this aggregator.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size.get()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch every unique URL in `urls`.
    ///
    /// Returns once every URL reached a terminal outcome. If `cancel` fires,
    /// URLs that never reached one are reported as [`FetchError::Cancelled`]
    /// failures.
    ///
    /// # Arguments
    ///
    /// * `urls` - Item page URLs; duplicates are fetched once
    /// * `cancel` - Batch cancellation; a child token is derived per call
    ///
    /// # Returns
    ///
    /// A [`FetchReport`] holding content for every URL that succeeded and a
    /// [`FetchFailure`](crate::models::FetchFailure) for every URL that did not.
    /// Per-URL errors never fail the call.
    pub async fn fetch_all<I, S>(&self, urls: I, cancel: &CancellationToken) -> FetchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tasks: Vec<FetchTask> = urls
            .into_iter()
            .map(Into::into)
            .unique()
            .map(FetchTask::new)
            .collect();
        let total = tasks.len();
        let t0 = Instant::now();

        let token = cancel.child_token();
        let _deadline = self
            .batch_timeout
            .map(|limit| arm_batch_deadline(limit, token.clone(), self.span.clone()));

        let store = Arc::new(ResultStore::new());
        let worker = Arc::new(FetchWorker::new(
            self.factory.clone(),
            self.policy,
            self.timeouts,
            token.clone(),
        ));

        info!(
            parent: &self.span,
            total,
            pool_size = self.pool_size.get(),
            max_attempts = self.policy.max_attempts(),
            "Starting concurrent page fetch"
        );

        stream::iter(tasks)
            .map(|task| {
                let worker = worker.clone();
                let store = store.clone();
                let token = token.clone();
                let span = self.span.clone();
                async move {
                    let url = task.url().to_string();
                    if token.is_cancelled() {
                        debug!(
                            parent: &span,
                            %url,
                            state = ?TaskState::Pending,
                            "Skipping queued page after cancellation"
                        );
                        store.record_failure(FetchFailure::cancelled(url));
                        return;
                    }

                    let sink = store.clone();
                    let handle = tokio::spawn(
                        async move {
                            let outcome = worker.execute(task).await;
                            sink.record(outcome);
                        }
                        .instrument(span.clone()),
                    );

                    if let Err(join_err) = handle.await {
                        let reason = if join_err.is_panic() {
                            panic_message(join_err.into_panic().as_ref())
                        } else {
                            "worker task aborted".to_string()
                        };
                        warn!(parent: &span, %url, %reason, "Fetch worker did not finish");
                        store.record_failure(FetchFailure {
                            url,
                            last_error: FetchError::fatal(format!("worker panicked: {reason}")),
                            attempts: 0,
                        });
                    }
                }
            })
            .buffer_unordered(self.pool_size.get())
            .collect::<Vec<()>>()
            .await;

        let report = store.take_report();
        let cancelled = report
            .failures
            .iter()
            .filter(|f| f.last_error == FetchError::Cancelled)
            .count();
        info!(
            parent: &self.span,
            total,
            fetched = report.results.len(),
            failed = report.failures.len(),
            cancelled,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Completed concurrent page fetch"
        );
        report
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn arm_batch_deadline(limit: Duration, token: CancellationToken, span: Span) -> AbortOnDrop {
    let handle = tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        warn!(parent: &span, ?limit, "Batch timeout elapsed; cancelling remaining pages");
        token.cancel();
    });
    AbortOnDrop(handle.abort_handle())
}

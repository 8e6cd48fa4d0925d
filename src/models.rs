//! Data models for fetch tasks and their outcomes.
//!
//! This module defines the values that flow through the fetch pool:
//! - [`FetchTask`]: one unique URL scheduled for retrieval
//! - [`FetchOutcome`]: the terminal result a worker reports for a task
//! - [`FetchFailure`]: a permanently failed URL with its last error
//! - [`TaskState`]: the per-task lifecycle used in log events

use crate::error::FetchError;

/// A single URL scheduled for retrieval.
///
/// Created once per unique URL when a batch is submitted and consumed by
/// exactly one worker attempt sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTask {
    url: String,
}

impl FetchTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn into_url(self) -> String {
        self.url
    }
}

/// A URL that ended without content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// The URL that failed.
    pub url: String,
    /// The error from the final attempt, or [`FetchError::Cancelled`] when
    /// the URL was never attempted.
    pub last_error: FetchError,
    /// How many attempts were actually made (0 if cancelled while queued).
    pub attempts: u32,
}

impl FetchFailure {
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_error: FetchError::Cancelled,
            attempts: 0,
        }
    }
}

/// Terminal result of one [`FetchTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { url: String, content: String },
    Failure(FetchFailure),
}

/// Lifecycle of a task: `Pending → Attempting → {Succeeded | Retrying →
/// Attempting | PermanentlyFailed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Attempting,
    Retrying,
    Succeeded,
    PermanentlyFailed,
}

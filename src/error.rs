//! Error types used by the queue, tasks and the lint collaborator.
//!
//! This module defines three error enums:
//!
//! - [`QueueError`]: misuse of the [`TaskQueue`](crate::TaskQueue) API.
//! - [`TaskError`]: outcome of a single task run that did not finish cleanly.
//! - [`LintError`]: failures while invoking the external linter or parsing its output.
//!
//! Each type provides `as_label` (stable snake_case label for logs/events).

use std::io;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the task queue.
///
/// These are programming errors on the caller's side; the queue state is left untouched.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The same task (or a clone of it) was enqueued a second time.
    #[error("task is already enqueued (key: {key})")]
    AlreadyEnqueued {
        /// Key of the offending task.
        key: String,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use lintvisor::QueueError;
    ///
    /// let err = QueueError::AlreadyEnqueued { key: "a.erb".into() };
    /// assert_eq!(err.as_label(), "queue_already_enqueued");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::AlreadyEnqueued { .. } => "queue_already_enqueued",
        }
    }
}

/// # Outcome of a task run that did not finish cleanly.
///
/// The drain loop logs these and moves on; they never stop the queue.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task was canceled (directly, by key, or superseded by a newer task).
    #[error("task canceled")]
    Canceled,

    /// Body reported failure through its token.
    #[error("task failed: {reason}")]
    Failed {
        /// Reason reported by the body.
        reason: String,
    },

    /// Body panicked while starting.
    #[error("task body panicked: {reason}")]
    Panicked {
        /// Panic message.
        reason: String,
    },

    /// Task did not complete within the queue's per-task timeout and was canceled.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use lintvisor::TaskError;
    ///
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Canceled => "task_canceled",
            TaskError::Failed { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Timeout { .. } => "task_timeout",
        }
    }

    /// True for cancellation, which is a normal outcome rather than a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// # Errors produced while running the external linter.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LintError {
    /// The command could not be found or executed.
    #[error("{command} is not executable")]
    NotExecutable {
        /// Command line that was attempted.
        command: String,
    },

    /// Spawning or waiting on the process failed for another reason.
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// Command line that was attempted.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The linter produced no output at all.
    #[error("command {command} returns empty output! please check configuration.")]
    EmptyOutput {
        /// Command line that was run.
        command: String,
    },

    /// Auto-corrected source could not be extracted from the linter output.
    #[error("error parsing auto-correction from CLI: {output}")]
    Autocorrect {
        /// Raw output that failed to parse.
        output: String,
    },

    /// Auto-correction exited with an unexpected status.
    #[error("an error occurred during auto-correction (exit status {status:?})")]
    AutocorrectStatus {
        /// Exit status, `None` if killed by a signal.
        status: Option<i32>,
    },

    /// Scheduling the lint task failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Settings could not be decoded.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl LintError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LintError::NotExecutable { .. } => "lint_not_executable",
            LintError::Spawn { .. } => "lint_spawn",
            LintError::EmptyOutput { .. } => "lint_empty_output",
            LintError::Autocorrect { .. } => "lint_autocorrect_parse",
            LintError::AutocorrectStatus { .. } => "lint_autocorrect_status",
            LintError::Queue(_) => "lint_queue",
            LintError::Settings(_) => "lint_settings",
        }
    }
}

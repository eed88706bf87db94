//! # Run a single task on behalf of the drain loop.
//!
//! Executes one [`Task`] with an optional timeout and publishes its terminal event to the [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   task.run() → Ok(())           → publish TaskFinished
//!
//! Cancellation (direct, by key, superseded):
//!   task.run() → Err(Canceled)    → publish TaskCanceled
//!
//! Failure:
//!   task.run() → Err(Failed/Panicked) → publish TaskFailed
//!
//! Timeout:
//!   timeout exceeded → task.cancel() → publish TaskFailed (timeout)
//!                    → already completed → outcome as recorded
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per run
//! - `Canceled` is a normal outcome → `TaskCanceled` (not `TaskFailed`)
//! - Never propagates panics or errors to the drain loop beyond the returned `Result`

use std::time::Duration;

use tokio::time;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::Task,
};

/// Runs `task` to completion, publishing lifecycle events to `bus`.
///
/// `queued` is the number of tracked tasks (this one included) and only feeds the
/// `TaskStarting` event.
pub async fn run_once(
    task: &Task,
    timeout: Option<Duration>,
    queued: usize,
    bus: &Bus,
) -> Result<(), TaskError> {
    let key = task.key().as_str();
    bus.publish(
        Event::new(EventKind::TaskStarting)
            .with_key(key)
            .with_queued(queued),
    );

    let res = match timeout {
        Some(dur) => match time::timeout(dur, task.run()).await {
            Ok(r) => r,
            Err(_elapsed) => expire(task, dur).await,
        },
        None => task.run().await,
    };

    match &res {
        Ok(()) => {
            tracing::debug!(key, "task finished");
            bus.publish(Event::new(EventKind::TaskFinished).with_key(key));
        }
        Err(TaskError::Canceled) => {
            tracing::debug!(key, "task canceled");
            bus.publish(Event::new(EventKind::TaskCanceled).with_key(key));
        }
        Err(e) => {
            tracing::warn!(key, error = %e, label = e.as_label(), "task did not finish cleanly");
            bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_key(key)
                    .with_reason(e.to_string()),
            );
        }
    }
    res
}

/// Cancels `task` after its deadline passed. A completion that beat the
/// cancellation keeps its recorded outcome.
async fn expire(task: &Task, timeout: Duration) -> Result<(), TaskError> {
    if task.cancel() {
        Err(TaskError::Timeout { timeout })
    } else {
        task.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskToken;

    #[tokio::test]
    async fn test_expire_cancels_running_task() {
        let task = Task::from_fn("f1", |_token: TaskToken| {});
        let runner = {
            let task = task.clone();
            tokio::spawn(async move { task.run().await })
        };
        while task.state() == crate::tasks::TaskState::Pending {
            tokio::task::yield_now().await;
        }

        let res = expire(&task, Duration::from_millis(5)).await;
        assert!(matches!(res, Err(TaskError::Timeout { .. })));
        assert!(matches!(runner.await.unwrap(), Err(TaskError::Canceled)));
    }

    #[tokio::test]
    async fn test_completion_at_deadline_keeps_outcome() {
        let done = Task::from_fn("f1", |token: TaskToken| {
            token.finish();
        });
        assert!(done.run().await.is_ok());
        assert!(expire(&done, Duration::from_millis(5)).await.is_ok());

        let failed = Task::from_fn("f2", |token: TaskToken| {
            token.fail("exit status 2");
        });
        assert!(failed.run().await.is_err());
        let res = expire(&failed, Duration::from_millis(5)).await;
        assert!(matches!(res, Err(TaskError::Failed { ref reason }) if reason == "exit status 2"));
    }

    #[tokio::test]
    async fn test_finished_run_publishes_finished_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let task = Task::from_fn("f1", |token: TaskToken| {
            token.finish();
        });

        let res = run_once(&task, Some(Duration::from_secs(5)), 1, &bus).await;
        assert!(res.is_ok());
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskStarting);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskFinished);
    }
}

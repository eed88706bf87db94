//! # Cancellable unit of work bound to a resource.
//!
//! A [`Task`] wraps a [`TaskBody`] and drives it through a small state machine:
//!
//! ```text
//!            run()                finish() / fail() / start panicked
//! Pending ──────────► Running ───────────────────────────────────► Finished
//!    │                   │
//!    │ cancel()          │ cancel()  (stop handle invoked once)
//!    ▼                   ▼
//! Canceled ◄─────────────┘
//! ```
//!
//! ## Rules
//! - The body is started **at most once**; a canceled pending task never starts it.
//! - Completion is a single-fire latch: whichever of `finish`, `fail`, `cancel`
//!   arrives first wins, every later call is ignored.
//! - The stop handle is invoked exactly once on cancellation, even when `cancel()`
//!   races with `start()` and the handle does not exist yet.
//! - Stop handles and bodies are never invoked while the internal lock is held. The
//!   one exception is the closure given to [`TaskToken::finish_with`], which runs under
//!   the lock so that its side effects and `cancel()` exclude each other.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::body::{Cancelable, TaskBody};
use crate::tasks::key::ResourceKey;

/// Lifecycle state of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created, body not started.
    Pending,
    /// Body started, completion not yet reported.
    Running,
    /// Body reported completion (successfully or not).
    Finished,
    /// Canceled before completion.
    Canceled,
}

impl TaskState {
    /// True for `Finished` and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Canceled)
    }

    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Finished => "finished",
            TaskState::Canceled => "canceled",
        }
    }
}

struct Slot {
    state: TaskState,
    body: Option<Box<dyn TaskBody>>,
    stop: Option<Box<dyn Cancelable>>,
    result: Option<Result<(), TaskError>>,
}

struct Inner {
    key: ResourceKey,
    enqueued: AtomicBool,
    /// Cancellation flag observed by the body.
    canceled: CancellationToken,
    /// Single-fire completion latch awaited by `run()`.
    done: CancellationToken,
    slot: Mutex<Slot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves completion once. Returns `false` if already resolved.
    fn complete(&self, result: Result<(), TaskError>) -> bool {
        let stop = {
            let mut slot = self.lock();
            if slot.state.is_terminal() {
                return false;
            }
            slot.state = TaskState::Finished;
            slot.result = Some(result);
            slot.stop.take()
        };
        drop(stop);
        self.done.cancel();
        true
    }

    /// Runs `publish` and resolves completion in one step under the slot lock.
    ///
    /// Returns `None` without running `publish` if completion was already resolved.
    /// A panic in `publish` completes the task with `TaskError::Panicked`.
    fn complete_with<R>(
        &self,
        result: Result<(), TaskError>,
        publish: impl FnOnce() -> R,
    ) -> Option<R> {
        let (out, stop) = {
            let mut slot = self.lock();
            if slot.state.is_terminal() {
                return None;
            }
            let (out, result) = match panic::catch_unwind(AssertUnwindSafe(publish)) {
                Ok(out) => (Some(out), result),
                Err(payload) => (
                    None,
                    Err(TaskError::Panicked {
                        reason: panic_message(payload.as_ref()),
                    }),
                ),
            };
            slot.state = TaskState::Finished;
            slot.result = Some(result);
            (out, slot.stop.take())
        };
        drop(stop);
        self.done.cancel();
        out
    }

    /// Stores the stop handle returned by `start`, or fires it right away when
    /// the task got canceled while `start` was still executing.
    fn arm(&self, stop: Box<dyn Cancelable>) {
        let mut slot = self.lock();
        match slot.state {
            TaskState::Running => slot.stop = Some(stop),
            TaskState::Canceled => {
                drop(slot);
                invoke_stop(&self.key, stop);
            }
            TaskState::Pending | TaskState::Finished => {}
        }
    }

    fn result(&self) -> Result<(), TaskError> {
        self.lock().result.clone().unwrap_or(Err(TaskError::Canceled))
    }
}

fn invoke_stop(key: &ResourceKey, stop: Box<dyn Cancelable>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| stop.stop())) {
        let panic = panic_message(payload.as_ref());
        tracing::warn!(key = %key, %panic, "stop handle panicked");
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Cancellable asynchronous work bound to a [`ResourceKey`].
///
/// `Task` is a handle: clones share the same state, so a caller can keep a clone
/// to observe or cancel the task after handing it to a [`TaskQueue`](crate::TaskQueue).
///
/// ## Example
/// ```rust
/// use lintvisor::{Task, TaskState, TaskToken};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let task = Task::from_fn("file:///app/views/index.html.erb", |token: TaskToken| {
///     let work = tokio::spawn(async move {
///         // ... spawn the linter, parse output ...
///         if !token.is_canceled() {
///             token.finish();
///         }
///     });
///     work.abort_handle()
/// });
///
/// task.run().await.unwrap();
/// assert_eq!(task.state(), TaskState::Finished);
/// # }
/// ```
#[derive(Clone)]
pub struct Task {
    inner: Arc<Inner>,
}

impl Task {
    /// Creates a pending task for `key` with the given body.
    pub fn new(key: impl Into<ResourceKey>, body: impl TaskBody) -> Self {
        Self {
            inner: Arc::new(Inner {
                key: key.into(),
                enqueued: AtomicBool::new(false),
                canceled: CancellationToken::new(),
                done: CancellationToken::new(),
                slot: Mutex::new(Slot {
                    state: TaskState::Pending,
                    body: Some(Box::new(body)),
                    stop: None,
                    result: None,
                }),
            }),
        }
    }

    /// Creates a task from a closure body.
    ///
    /// Same as [`Task::new`] but lets the compiler infer the closure argument.
    pub fn from_fn<F, C>(key: impl Into<ResourceKey>, f: F) -> Self
    where
        F: FnOnce(TaskToken) -> C + Send + 'static,
        C: Cancelable,
    {
        Self::new(key, f)
    }

    /// Resource this task works on.
    pub fn key(&self) -> &ResourceKey {
        &self.inner.key
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.inner.lock().state
    }

    /// True once [`cancel`](Task::cancel) took effect.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.is_cancelled()
    }

    /// True once the task was handed to a queue.
    pub fn is_enqueued(&self) -> bool {
        self.inner.enqueued.load(Ordering::Acquire)
    }

    /// Marks the task enqueued; `false` if it already was.
    pub(crate) fn mark_enqueued(&self) -> bool {
        !self.inner.enqueued.swap(true, Ordering::AcqRel)
    }

    /// True if both handles refer to the same task.
    pub fn ptr_eq(&self, other: &Task) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Starts the body and waits until the task completes or is canceled.
    ///
    /// - Already canceled: returns `Err(TaskError::Canceled)` without touching the body.
    /// - Otherwise: invokes the body once, then suspends until `finish`, `fail`
    ///   or `cancel` resolves completion.
    /// - A panic inside `start` completes the task with `TaskError::Panicked`.
    ///
    /// Calling `run` again later never re-invokes the body; it just reports the
    /// recorded outcome.
    pub async fn run(&self) -> Result<(), TaskError> {
        let body = {
            let mut slot = self.inner.lock();
            if slot.state == TaskState::Pending {
                slot.state = TaskState::Running;
                slot.body.take()
            } else {
                None
            }
        };

        if let Some(body) = body {
            let token = TaskToken {
                inner: Arc::clone(&self.inner),
            };
            match panic::catch_unwind(AssertUnwindSafe(|| body.start(token))) {
                Ok(stop) => self.inner.arm(stop),
                Err(payload) => {
                    self.inner.complete(Err(TaskError::Panicked {
                        reason: panic_message(payload.as_ref()),
                    }));
                }
            }
        }

        self.inner.done.cancelled().await;
        self.inner.result()
    }

    /// Waits for completion without starting the body.
    ///
    /// Meant for observers of a task owned by a queue. On a task nobody runs or
    /// cancels this never returns.
    pub async fn wait(&self) -> Result<(), TaskError> {
        self.inner.done.cancelled().await;
        self.inner.result()
    }

    /// Cancels the task. Idempotent.
    ///
    /// Sets the cancellation flag, invokes the stop handle (if the body already
    /// returned one) and resolves completion, unblocking [`run`](Task::run).
    /// Has no effect on a task that already finished or was canceled.
    ///
    /// Returns `true` if this call performed the cancellation.
    pub fn cancel(&self) -> bool {
        match self.begin_cancel() {
            Some(cancellation) => {
                cancellation.complete();
                true
            }
            None => false,
        }
    }

    /// First half of [`cancel`](Task::cancel): flips the state and the flag.
    ///
    /// Runs no user code, so it is safe to call under a queue lock. The returned
    /// [`Cancellation`] must be completed afterwards.
    pub(crate) fn begin_cancel(&self) -> Option<Cancellation> {
        let mut slot = self.inner.lock();
        if slot.state.is_terminal() {
            return None;
        }
        slot.state = TaskState::Canceled;
        slot.result = Some(Err(TaskError::Canceled));
        self.inner.canceled.cancel();
        Some(Cancellation {
            inner: Arc::clone(&self.inner),
            stop: slot.stop.take(),
            body: slot.body.take(),
        })
    }
}

/// Pending side effects of a cancellation started by [`Task::begin_cancel`].
#[must_use = "a started cancellation must be completed"]
pub(crate) struct Cancellation {
    inner: Arc<Inner>,
    stop: Option<Box<dyn Cancelable>>,
    body: Option<Box<dyn TaskBody>>,
}

impl Cancellation {
    /// Invokes the stop handle (if any) and resolves completion.
    pub(crate) fn complete(self) {
        let Cancellation { inner, stop, body } = self;
        drop(body);
        if let Some(stop) = stop {
            invoke_stop(&inner.key, stop);
        }
        inner.done.cancel();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("key", &self.inner.key)
            .field("state", &self.state())
            .field("enqueued", &self.is_enqueued())
            .finish()
    }
}

/// Handle given to a running body.
///
/// The body must check [`is_canceled`](TaskToken::is_canceled) after every
/// suspension point before acting on results, and report completion exactly once.
#[derive(Clone)]
pub struct TaskToken {
    inner: Arc<Inner>,
}

impl TaskToken {
    /// Resource the task works on.
    pub fn key(&self) -> &ResourceKey {
        &self.inner.key
    }

    /// Live view of the task's cancellation flag.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.is_cancelled()
    }

    /// Completes when the task is canceled.
    pub async fn cancelled(&self) {
        self.inner.canceled.cancelled().await
    }

    /// Reports successful completion. Returns `false` if completion was already resolved.
    pub fn finish(&self) -> bool {
        self.inner.complete(Ok(()))
    }

    /// Reports failed completion. Returns `false` if completion was already resolved.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.inner.complete(Err(TaskError::Failed {
            reason: reason.into(),
        }))
    }

    /// Runs `publish` and reports successful completion atomically with respect to
    /// [`Task::cancel`].
    ///
    /// Either the task gets canceled first and `publish` never runs (`None`), or
    /// `publish` runs to the end and a concurrent `cancel()` finds the task finished.
    /// `publish` executes under the task's lock: it must be short and must not call
    /// back into this task or into the queue holding it.
    pub fn finish_with<R>(&self, publish: impl FnOnce() -> R) -> Option<R> {
        self.inner.complete_with(Ok(()), publish)
    }

    /// Like [`finish_with`](TaskToken::finish_with), reporting failed completion.
    pub fn fail_with<R>(
        &self,
        reason: impl Into<String>,
        publish: impl FnOnce() -> R,
    ) -> Option<R> {
        let result = Err(TaskError::Failed {
            reason: reason.into(),
        });
        self.inner.complete_with(result, publish)
    }
}

impl fmt::Debug for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskToken")
            .field("key", &self.inner.key)
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    /// Body that never completes on its own; counts starts and stops.
    fn hanging(starts: &Arc<AtomicUsize>, stops: &Arc<AtomicUsize>) -> Task {
        let (starts, stops) = (starts.clone(), stops.clone());
        Task::from_fn("f1", move |_token: TaskToken| {
            starts.fetch_add(1, Ordering::SeqCst);
            move || {
                stops.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test]
    async fn test_finish_resolves_run() {
        let task = Task::from_fn("f1", |token: TaskToken| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                token.finish();
            })
            .abort_handle()
        });

        assert_eq!(task.state(), TaskState::Pending);
        assert!(task.run().await.is_ok());
        assert_eq!(task.state(), TaskState::Finished);
        assert!(!task.is_canceled());
    }

    #[tokio::test]
    async fn test_fail_is_reported_by_run() {
        let task = Task::from_fn("f1", |token: TaskToken| {
            token.fail("exit status 2");
        });

        let err = task.run().await.unwrap_err();
        assert!(matches!(err, TaskError::Failed { ref reason } if reason == "exit status 2"));
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[tokio::test]
    async fn test_canceled_pending_task_never_starts() {
        let (starts, stops) = (counter(), counter());
        let task = hanging(&starts, &stops);

        assert!(task.cancel());
        assert!(matches!(task.run().await, Err(TaskError::Canceled)));
        assert_eq!(starts.load(Ordering::SeqCst), 0);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        assert_eq!(task.state(), TaskState::Canceled);
    }

    #[tokio::test]
    async fn test_cancel_running_task_stops_once_and_unblocks_run() {
        let (starts, stops) = (counter(), counter());
        let task = hanging(&starts, &stops);

        let runner = {
            let task = task.clone();
            tokio::spawn(async move { task.run().await })
        };
        while task.state() != TaskState::Running {
            tokio::task::yield_now().await;
        }

        assert!(task.cancel());
        assert!(!task.cancel());
        assert!(matches!(runner.await.unwrap(), Err(TaskError::Canceled)));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completion_fires_once() {
        let slot: Arc<OnceLock<TaskToken>> = Arc::new(OnceLock::new());
        let task = {
            let slot = slot.clone();
            Task::from_fn("f1", move |token: TaskToken| {
                let _ = slot.set(token);
            })
        };

        let runner = {
            let task = task.clone();
            tokio::spawn(async move { task.run().await })
        };
        while slot.get().is_none() {
            tokio::task::yield_now().await;
        }

        let token = slot.get().unwrap();
        assert!(token.finish());
        assert!(!token.finish());
        assert!(!token.fail("late"));
        assert!(!task.cancel());
        assert!(runner.await.unwrap().is_ok());
        assert!(!token.is_canceled());
    }

    #[tokio::test]
    async fn test_cancel_during_start_still_stops_once() {
        let stops = counter();
        let cell: Arc<OnceLock<Task>> = Arc::new(OnceLock::new());
        let task = {
            let cell = cell.clone();
            let stops = stops.clone();
            Task::from_fn("f1", move |token: TaskToken| {
                cell.get().unwrap().cancel();
                assert!(token.is_canceled());
                move || {
                    stops.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        cell.set(task.clone()).unwrap();

        assert!(matches!(task.run().await, Err(TaskError::Canceled)));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!task.cancel());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_start_completes_task() {
        let task = Task::from_fn("f1", |_token: TaskToken| -> () { panic!("boom") });

        let err = task.run().await.unwrap_err();
        assert!(matches!(err, TaskError::Panicked { ref reason } if reason == "boom"));
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[tokio::test]
    async fn test_second_run_reports_recorded_outcome() {
        let starts = counter();
        let task = {
            let starts = starts.clone();
            Task::from_fn("f1", move |token: TaskToken| {
                starts.fetch_add(1, Ordering::SeqCst);
                token.finish();
            })
        };

        assert!(task.run().await.is_ok());
        assert!(task.run().await.is_ok());
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_observes_without_starting() {
        let (starts, stops) = (counter(), counter());
        let task = hanging(&starts, &stops);

        let observer = {
            let task = task.clone();
            tokio::spawn(async move { task.wait().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(task.state(), TaskState::Pending);

        task.cancel();
        assert!(matches!(observer.await.unwrap(), Err(TaskError::Canceled)));
        assert_eq!(starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_finish_with_skipped_after_cancel() {
        let slot: Arc<OnceLock<TaskToken>> = Arc::new(OnceLock::new());
        let task = {
            let slot = slot.clone();
            Task::from_fn("f1", move |token: TaskToken| {
                let _ = slot.set(token);
            })
        };
        let runner = {
            let task = task.clone();
            tokio::spawn(async move { task.run().await })
        };
        while slot.get().is_none() {
            tokio::task::yield_now().await;
        }

        assert!(task.cancel());
        let published = counter();
        let token = slot.get().unwrap();
        assert!(token.finish_with(|| published.fetch_add(1, Ordering::SeqCst)).is_none());
        assert!(token.fail_with("late", || published.fetch_add(1, Ordering::SeqCst)).is_none());
        assert_eq!(published.load(Ordering::SeqCst), 0);
        assert!(matches!(runner.await.unwrap(), Err(TaskError::Canceled)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_waits_for_finish_with() {
        let slot: Arc<OnceLock<TaskToken>> = Arc::new(OnceLock::new());
        let task = {
            let slot = slot.clone();
            Task::from_fn("f1", move |token: TaskToken| {
                let _ = slot.set(token);
            })
        };
        let runner = {
            let task = task.clone();
            tokio::spawn(async move { task.run().await })
        };
        while slot.get().is_none() {
            tokio::task::yield_now().await;
        }

        let token = slot.get().unwrap().clone();
        let published = Arc::new(AtomicBool::new(false));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let publisher = {
            let published = published.clone();
            std::thread::spawn(move || {
                token.finish_with(|| {
                    entered_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(100));
                    published.store(true, Ordering::SeqCst);
                })
            })
        };

        entered_rx.recv().unwrap();
        assert!(!task.cancel());
        assert!(published.load(Ordering::SeqCst));
        assert_eq!(publisher.join().unwrap(), Some(()));
        assert!(runner.await.unwrap().is_ok());
        assert_eq!(task.state(), TaskState::Finished);
        assert!(!task.is_canceled());
    }

    #[tokio::test]
    async fn test_panicking_finish_with_completes_task() {
        let task = Task::from_fn("f1", |token: TaskToken| {
            let out: Option<()> = token.finish_with(|| panic!("sink exploded"));
            assert!(out.is_none());
        });

        let err = task.run().await.unwrap_err();
        assert!(matches!(err, TaskError::Panicked { ref reason } if reason == "sink exploded"));
    }

    #[test]
    fn test_enqueued_marker_is_single_shot() {
        let task = Task::from_fn("f1", |token: TaskToken| {
            token.finish();
        });
        let clone = task.clone();

        assert!(!task.is_enqueued());
        assert!(task.mark_enqueued());
        assert!(!clone.mark_enqueued());
        assert!(clone.is_enqueued());
        assert!(task.ptr_eq(&clone));
    }
}

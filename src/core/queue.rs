//! # TaskQueue: single-flight, per-key task queue.
//!
//! The [`TaskQueue`] owns an ordered sequence of [`Task`]s and drains it with a
//! single worker, so at most one task body is ever mid-flight. Enqueueing a task
//! cancels every tracked task sharing its [`ResourceKey`] first, so at most one
//! task per key is live at any moment.
//!
//! ## Architecture
//! ```text
//! enqueue(task) ──┐  (lock) collect same-key tasks, begin_cancel, push_back, claim busy
//!                 │  (unlock) complete cancellations, spawn drain if claimed
//!                 ▼
//!        ┌────────────────────────────────────────────┐
//!        │ VecDeque<Task>  [ A(f1) | B(f2) | C(f1)* ] │   * A canceled in place
//!        └────────────────────────────────────────────┘
//!                 │
//!                 ▼
//! drain loop (one at a time):
//!   loop {
//!     ├─► peek head (empty → clear busy, publish QueueIdle, exit)
//!     ├─► canceled head → publish TaskCanceled, else run_once(head)
//!     └─► pop head
//!   }
//! ```
//!
//! ## Rules
//! - Strict FIFO by enqueue time; canceled tasks are skipped without starting.
//! - Every tracked task gets exactly one terminal event.
//! - Only the drain loop removes tasks, and only from the head.
//! - No stop handle or body runs while the queue lock is held.
//! - A failing or panicking task never stalls the loop.
//! - Dropping the queue cancels every tracked task.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::runner::run_once;
use crate::error::QueueError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{Cancellation, ResourceKey, Task, panic_message};

struct State {
    tasks: VecDeque<Task>,
    busy: bool,
}

struct Shared {
    state: Mutex<State>,
    bus: Bus,
    timeout: Option<Duration>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-flight task queue keyed by resource.
///
/// ## Example
/// ```rust
/// use lintvisor::{Task, TaskQueue, TaskToken};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = TaskQueue::default();
/// let mut rx = queue.bus().subscribe();
///
/// let task = Task::from_fn("/app/views/a.html.erb", |token: TaskToken| {
///     tokio::spawn(async move { token.finish(); }).abort_handle()
/// });
/// queue.enqueue(task).unwrap();
///
/// while let Ok(ev) = rx.recv().await {
///     if ev.kind == lintvisor::EventKind::QueueIdle { break; }
/// }
/// assert!(queue.is_empty());
/// # }
/// ```
pub struct TaskQueue {
    shared: Arc<Shared>,
    listener: CancellationToken,
}

impl TaskQueue {
    /// Creates a queue and wires `subscribers` to its event bus.
    ///
    /// Must be called from within a Tokio runtime when `subscribers` is non-empty.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let listener = CancellationToken::new();

        if !subscribers.is_empty() {
            let set = SubscriberSet::new(subscribers, bus.clone());
            spawn_listener(&bus, set, listener.clone());
        }

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    tasks: VecDeque::new(),
                    busy: false,
                }),
                bus,
                timeout: cfg.task_timeout(),
            }),
            listener,
        }
    }

    /// Event bus the queue publishes to.
    pub fn bus(&self) -> &Bus {
        &self.shared.bus
    }

    /// Number of tracked tasks (pending + running).
    pub fn len(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// True if no task is tracked.
    pub fn is_empty(&self) -> bool {
        self.shared.lock().tasks.is_empty()
    }

    /// True while the drain loop is active.
    pub fn is_busy(&self) -> bool {
        self.shared.lock().busy
    }

    /// Appends `task`, superseding every tracked task with the same key.
    ///
    /// Returns immediately; the task runs once every task ahead of it has finished.
    ///
    /// # Errors
    /// [`QueueError::AlreadyEnqueued`] if this task (or a clone of it) was enqueued
    /// before. The queue is left untouched.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime while the queue is idle.
    pub fn enqueue(&self, task: Task) -> Result<(), QueueError> {
        let key = task.key().clone();
        let (superseded, start, queued) = {
            let mut st = self.shared.lock();
            if !task.mark_enqueued() {
                return Err(QueueError::AlreadyEnqueued {
                    key: key.to_string(),
                });
            }
            let superseded = begin_cancel_matching(&st.tasks, &key);
            st.tasks.push_back(task);
            let start = !st.busy;
            st.busy = true;
            (superseded, start, st.tasks.len())
        };

        let bus = &self.shared.bus;
        bus.publish(
            Event::new(EventKind::TaskEnqueued)
                .with_key(key.as_str())
                .with_queued(queued),
        );
        for cancellation in superseded {
            cancellation.complete();
            tracing::debug!(key = key.as_str(), "superseded previous task");
            bus.publish(Event::new(EventKind::TaskSuperseded).with_key(key.as_str()));
        }

        if start {
            tokio::spawn(drain(Arc::clone(&self.shared)));
        }
        Ok(())
    }

    /// Cancels every tracked task whose key equals `key`.
    ///
    /// No-op when nothing matches. Returns how many tasks this call canceled.
    pub fn cancel(&self, key: &ResourceKey) -> usize {
        let canceled = begin_cancel_matching(&self.shared.lock().tasks, key);
        let n = canceled.len();
        canceled.into_iter().for_each(Cancellation::complete);
        if n > 0 {
            tracing::debug!(key = key.as_str(), canceled = n, "canceled tasks by key");
        }
        n
    }

    /// Cancels every tracked task.
    pub fn cancel_all(&self) -> usize {
        let canceled: Vec<Cancellation> = {
            let st = self.shared.lock();
            st.tasks.iter().filter_map(Task::begin_cancel).collect()
        };
        let n = canceled.len();
        canceled.into_iter().for_each(Cancellation::complete);
        n
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(Config::default(), Vec::new())
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.cancel_all();
        self.listener.cancel();
    }
}

fn begin_cancel_matching(tasks: &VecDeque<Task>, key: &ResourceKey) -> Vec<Cancellation> {
    tasks
        .iter()
        .filter(|t| t.key() == key)
        .filter_map(Task::begin_cancel)
        .collect()
}

/// Drains the queue head-first until it is empty.
async fn drain(shared: Arc<Shared>) {
    loop {
        let (head, queued) = {
            let mut st = shared.lock();
            match st.tasks.front().cloned() {
                Some(t) => (t, st.tasks.len()),
                None => {
                    st.busy = false;
                    break;
                }
            }
        };

        if head.is_canceled() {
            shared
                .bus
                .publish(Event::new(EventKind::TaskCanceled).with_key(head.key().as_str()));
        } else {
            let run = run_once(&head, shared.timeout, queued, &shared.bus);
            if let Err(panic_err) = std::panic::AssertUnwindSafe(run).catch_unwind().await {
                let reason = panic_message(panic_err.as_ref());
                tracing::error!(key = head.key().as_str(), %reason, "task run panicked");
                head.cancel();
            }
        }

        let mut st = shared.lock();
        if st.tasks.front().is_some_and(|t| t.ptr_eq(&head)) {
            st.tasks.pop_front();
        }
    }
    shared.bus.publish(Event::new(EventKind::QueueIdle));
}

/// Forwards bus events to the subscriber set until the queue is dropped.
fn spawn_listener(bus: &Bus, set: SubscriberSet, stop: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        set.shutdown().await;
    });
}

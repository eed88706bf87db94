//! # lintvisor
//!
//! **Lintvisor** runs an external, slow, cancellable linter process per document
//! without ever overlapping runs.
//!
//! Editors fire lint requests on open, save and explicit commands, often several per
//! second for the same file. Lintvisor funnels them through a single-flight
//! [`TaskQueue`]: at most one run is in flight, runs start in request order, and a new
//! request for a document supersedes (cancels) the older one, so stale results are
//! never published.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   did_open / did_save / execute / correct / clear
//!        │
//!        ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Linter (editor-facing)                                          │
//! │  - LintConfig (settings, reloadable)                             │
//! │  - command_arguments / exec (child process, kill on drop)        │
//! │  - parse_compact / parse_autocorrect (output parsers)            │
//! │  - DiagnosticSink (diagnostics + warnings out)                   │
//! └──────┬───────────────────────────────────────────────────────────┘
//!        │ Task(ResourceKey, body)
//!        ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  TaskQueue                                                       │
//! │  - FIFO of Tasks, one drained at a time                          │
//! │  - same-key supersession on enqueue                              │
//! │  - cancel(key) / cancel_all()                                    │
//! └──────┬───────────────────────────────────────────────────────────┘
//!        │ Publishes: TaskEnqueued, TaskSuperseded, TaskStarting,
//!        │            TaskFinished, TaskCanceled, TaskFailed, QueueIdle
//!        ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                      │
//! └─────────────────────────────────┬────────────────────────────────┘
//!                                   ▼
//!                            SubscriberSet
//!                         (per-subscriber queues)
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                      LogWriter  custom   custom
//! ```
//!
//! ### Task lifecycle
//! ```text
//! Task::new(key, body) ──► TaskQueue::enqueue
//!
//! drain loop {
//!   ├─► head = front of queue (none → QueueIdle, exit)
//!   ├─► head canceled already ─► TaskCanceled (no TaskStarting, body never started)
//!   ├─► otherwise publish TaskStarting, then head.run()
//!   │     └─ body.start(token) ─► stop handle
//!   │           ├─ token.finish() ─► TaskFinished
//!   │           ├─ token.fail(..) ─► TaskFailed
//!   │           └─ cancel()       ─► stop handle invoked once ─► TaskCanceled
//!   └─► pop head
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                       |
//! |-------------------|---------------------------------------------------------------|------------------------------------------|
//! | **Tasks**         | Cancellable work bound to a resource, single-fire completion. | [`Task`], [`TaskToken`], [`TaskBody`]    |
//! | **Queue**         | Single-flight FIFO with per-key supersession.                 | [`TaskQueue`], [`Config`]                |
//! | **Identity**      | Canonical resource keys (`file:` URLs equal their paths).     | [`ResourceKey`]                          |
//! | **Subscriber API**| Hook into queue events (logging, metrics, custom).            | [`Subscribe`], [`Event`], [`EventKind`]  |
//! | **Linting**       | External linter driver and output parsers.                    | [`Linter`], [`LintConfig`], [`DiagnosticSink`] |
//! | **Errors**        | Typed errors for queue misuse, task outcomes and lint runs.   | [`QueueError`], [`TaskError`], [`LintError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber (enabled by default).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use lintvisor::{Config, EventKind, Subscribe, Task, TaskQueue, TaskToken};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(lintvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let queue = TaskQueue::new(Config::default(), subs);
//!     let mut events = queue.bus().subscribe();
//!
//!     // Two requests for the same document: the first one is superseded.
//!     for round in 0..2 {
//!         let task = Task::from_fn("/app/views/index.html.erb", move |token: TaskToken| {
//!             let work = tokio::spawn(async move {
//!                 println!("lint round {round}");
//!                 token.finish();
//!             });
//!             work.abort_handle()
//!         });
//!         queue.enqueue(task).unwrap();
//!     }
//!
//!     while let Ok(ev) = events.recv().await {
//!         if ev.kind == EventKind::QueueIdle {
//!             break;
//!         }
//!     }
//!     assert!(queue.is_empty());
//! }
//! ```

mod core;
mod error;
mod events;
mod lint;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Config, TaskQueue};
pub use error::{LintError, QueueError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use lint::{
    Diagnostic, DiagnosticSink, Document, ExecOutput, Invocation, LintConfig, Linter,
    LinterBuilder, MemorySink, Offense, Position, Range, Severity, TextEdit, command_arguments,
    exec, parse_autocorrect, parse_compact, working_dir,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Cancelable, ResourceKey, Task, TaskBody, TaskState, TaskToken};

// Optional: expose a simple built-in logger subscriber (demo/reference only).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

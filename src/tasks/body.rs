//! # Task bodies and their stop handles.
//!
//! A [`TaskBody`] *starts* asynchronous work and hands back a [`Cancelable`]
//! describing how to stop it. The work itself reports completion through the
//! [`TaskToken`](crate::TaskToken) it was started with.
//!
//! ```text
//! Task::run()
//!   └─► body.start(token) ──► Box<dyn Cancelable>   (kept by the task)
//!                 │
//!                 └─► work in flight ──► token.finish() / token.fail(..)
//!
//! Task::cancel()
//!   └─► stop.stop()   (exactly once, e.g. abort the process future)
//! ```
//!
//! Closures work out of the box:
//! - `FnOnce(TaskToken) -> C` is a body whenever `C: Cancelable`;
//! - `FnOnce()` is a stop handle;
//! - a Tokio [`AbortHandle`] or [`JoinHandle`] is a stop handle (aborting drops the
//!   future, which kills children spawned with `kill_on_drop`).

use tokio::task::{AbortHandle, JoinHandle};

use crate::tasks::task::TaskToken;

/// Handle able to stop work started by a [`TaskBody`].
pub trait Cancelable: Send + 'static {
    /// Stops the underlying work. Called at most once.
    fn stop(self: Box<Self>);
}

impl<F> Cancelable for F
where
    F: FnOnce() + Send + 'static,
{
    fn stop(self: Box<Self>) {
        (*self)()
    }
}

impl Cancelable for AbortHandle {
    fn stop(self: Box<Self>) {
        self.abort();
    }
}

impl<T: Send + 'static> Cancelable for JoinHandle<T> {
    fn stop(self: Box<Self>) {
        self.abort();
    }
}

/// Work that cannot be interrupted.
impl Cancelable for () {
    fn stop(self: Box<Self>) {}
}

/// Starts the asynchronous work of a task.
///
/// `start` must not block: it kicks the work off (typically by spawning a future)
/// and returns immediately. The work must eventually call
/// [`TaskToken::finish`] or [`TaskToken::fail`], unless the task is canceled first.
pub trait TaskBody: Send + 'static {
    /// Starts the work and returns how to stop it.
    fn start(self: Box<Self>, token: TaskToken) -> Box<dyn Cancelable>;
}

impl<F, C> TaskBody for F
where
    F: FnOnce(TaskToken) -> C + Send + 'static,
    C: Cancelable,
{
    fn start(self: Box<Self>, token: TaskToken) -> Box<dyn Cancelable> {
        Box::new((*self)(token))
    }
}

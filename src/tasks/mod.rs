//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`Task`] - cancellable unit of work bound to a resource
//! - [`TaskToken`] - handle the running body uses to observe cancellation and report completion
//! - [`TaskBody`] / [`Cancelable`] - how work is started and stopped
//! - [`ResourceKey`] - canonicalized resource identity

mod body;
mod key;
mod task;

pub use body::{Cancelable, TaskBody};
pub use key::ResourceKey;
pub(crate) use task::{Cancellation, panic_message};
pub use task::{Task, TaskState, TaskToken};

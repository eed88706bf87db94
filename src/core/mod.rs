//! Queue core: scheduling and cancellation.
//!
//! The only public API from this module is [`TaskQueue`] and its [`Config`].
//!
//! Internal modules:
//! - [`queue`]: FIFO sequence, per-key supersession, drain loop;
//! - [`runner`]: runs one task with optional timeout and event publishing;
//! - [`config`]: queue settings.

mod config;
mod queue;
mod runner;

pub use config::Config;
pub use queue::TaskQueue;

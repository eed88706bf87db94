//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders queue events through `tracing`.

mod log;

pub use log::LogWriter;

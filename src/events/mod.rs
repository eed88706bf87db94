//! Queue events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskQueue::enqueue`, the drain loop and its runner,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the queue's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained through [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

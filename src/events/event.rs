//! # Events emitted by the task queue.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Queue events**: task flow through the queue (enqueued, superseded, starting, terminal, idle)
//! - **Subscriber events**: problems delivering events to subscribers (overflow, panic)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! resource key, a reason and the queue length at emission time.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use lintvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_key("/app/views/index.html.erb")
//!     .with_reason("exit status 2")
//!     .with_queued(3);
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.key.as_deref(), Some("/app/views/index.html.erb"));
//! assert_eq!(ev.queued, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Queue events ===
    /// Task appended to the queue.
    ///
    /// Sets:
    /// - `key`: resource key
    /// - `queued`: tracked tasks after the append
    TaskEnqueued,

    /// Task canceled because a newer task for the same key was enqueued.
    ///
    /// Sets:
    /// - `key`: resource key
    TaskSuperseded,

    /// Drain loop reached the task and is about to run it.
    ///
    /// Sets:
    /// - `key`: resource key
    /// - `queued`: tracked tasks, including this one
    TaskStarting,

    /// Task body reported successful completion.
    ///
    /// Sets:
    /// - `key`: resource key
    TaskFinished,

    /// Task ended canceled (before or while running).
    ///
    /// Sets:
    /// - `key`: resource key
    TaskCanceled,

    /// Task body reported failure or panicked.
    ///
    /// Sets:
    /// - `key`: resource key
    /// - `reason`: failure message
    TaskFailed,

    /// Drain loop found the queue empty and stopped.
    QueueIdle,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `key`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::TaskEnqueued => "enqueued",
            EventKind::TaskSuperseded => "superseded",
            EventKind::TaskStarting => "starting",
            EventKind::TaskFinished => "finished",
            EventKind::TaskCanceled => "canceled",
            EventKind::TaskFailed => "failed",
            EventKind::QueueIdle => "queue-idle",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::SubscriberPanicked => "subscriber-panicked",
        }
    }
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Canonical resource key (or subscriber name for subscriber events).
    pub key: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Number of tracked tasks at emission time.
    pub queued: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            reason: None,
            queued: None,
        }
    }

    /// Attaches a resource key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the queue length (saturating at `u32::MAX`).
    #[inline]
    pub fn with_queued(mut self, n: usize) -> Self {
        self.queued = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_key(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_key(subscriber)
            .with_reason(info)
    }

    /// True for events emitted about subscribers themselves.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

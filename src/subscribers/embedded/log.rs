//! # LogWriter via queue events rendered through `tracing`
//!
//! A small subscriber that forwards incoming [`Event`]s to the `tracing`
//! ecosystem. Install any `tracing` subscriber (e.g. `tracing-subscriber` with
//! an `EnvFilter`) in the host binary to see the output.
//!
//! ## Example output
//! ```text
//! DEBUG lintvisor: [enqueued] key="/app/a.html.erb" queued=1
//! DEBUG lintvisor: [superseded] key="/app/a.html.erb"
//! DEBUG lintvisor: [starting] key="/app/a.html.erb" queued=1
//! DEBUG lintvisor: [finished] key="/app/a.html.erb"
//!  WARN lintvisor: [failed] key="/app/b.html.erb" err="exit status 2"
//! TRACE lintvisor: [queue-idle]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref().unwrap_or("");
        let label = e.kind.as_label();
        match e.kind {
            EventKind::TaskEnqueued | EventKind::TaskStarting => {
                tracing::debug!(target: "lintvisor", "[{label}] key={key:?} queued={:?}", e.queued);
            }
            EventKind::TaskSuperseded | EventKind::TaskCanceled | EventKind::TaskFinished => {
                tracing::debug!(target: "lintvisor", "[{label}] key={key:?}");
            }
            EventKind::TaskFailed => {
                tracing::warn!(target: "lintvisor", "[{label}] key={key:?} err={:?}", e.reason);
            }
            EventKind::QueueIdle => {
                tracing::trace!(target: "lintvisor", "[{label}]");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(
                    target: "lintvisor",
                    "[{label}] subscriber={key} info={}",
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

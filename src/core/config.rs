//! # Queue configuration.
//!
//! Provides [`Config`], centralized settings for a [`TaskQueue`](crate::TaskQueue).
//!
//! ## Sentinel values
//! - `timeout = 0s` → no per-task timeout (a task may wait forever for its body)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Configuration for a task queue.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `timeout`: Per-task run timeout (`0s` = no timeout)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Maximum time a single task may stay running.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = the drain loop cancels the task (invoking its stop handle) and moves on
    ///
    /// Guards the queue against bodies that never report completion.
    pub timeout: Duration,
}

impl Config {
    /// Returns the per-task timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied to each run
    #[inline]
    pub fn task_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sentinels() {
        let cfg = Config {
            bus_capacity: 0,
            timeout: Duration::ZERO,
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert!(cfg.task_timeout().is_none());

        let cfg = Config {
            timeout: Duration::from_secs(30),
            ..Config::default()
        };
        assert_eq!(cfg.task_timeout(), Some(Duration::from_secs(30)));
    }
}

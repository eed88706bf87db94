//! # Editor-facing output of the linter.
//!
//! The linter never talks to an editor directly. It reports through a
//! [`DiagnosticSink`]: per-document diagnostics plus user-facing warnings.
//! [`MemorySink`] is a ready-made implementation that keeps everything in memory,
//! handy for hosts that render diagnostics themselves and for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::lint::document::Diagnostic;
use crate::tasks::ResourceKey;

/// Receiver of lint results and warnings.
///
/// Methods are called from the linter's worker tasks; implementations must not block.
/// Results are published while the run's task is locked against cancellation, so
/// implementations must not call back into the [`Linter`](crate::Linter).
pub trait DiagnosticSink: Send + Sync + 'static {
    /// Replaces all diagnostics of `key`.
    fn set(&self, key: &ResourceKey, diagnostics: Vec<Diagnostic>);

    /// Removes all diagnostics of `key`.
    fn delete(&self, key: &ResourceKey);

    /// Shows a warning to the user.
    fn warn(&self, message: &str);
}

#[derive(Default)]
struct Store {
    diagnostics: HashMap<ResourceKey, Vec<Diagnostic>>,
    warnings: Vec<String>,
}

/// In-memory diagnostic collection.
#[derive(Default)]
pub struct MemorySink {
    store: Mutex<Store>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Diagnostics currently stored for `key` (`None` if never set or deleted).
    pub fn get(&self, key: &ResourceKey) -> Option<Vec<Diagnostic>> {
        self.lock().diagnostics.get(key).cloned()
    }

    /// Warnings shown so far, oldest first.
    pub fn warnings(&self) -> Vec<String> {
        self.lock().warnings.clone()
    }

    /// Number of documents with stored diagnostics.
    pub fn len(&self) -> usize {
        self.lock().diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().diagnostics.is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn set(&self, key: &ResourceKey, diagnostics: Vec<Diagnostic>) {
        self.lock().diagnostics.insert(key.clone(), diagnostics);
    }

    fn delete(&self, key: &ResourceKey) {
        self.lock().diagnostics.remove(key);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "lintvisor", "{message}");
        self.lock().warnings.push(message.to_string());
    }
}

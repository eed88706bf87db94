//! # Linter: editor-facing driver of the external linter.
//!
//! A [`Linter`] turns document events into lint runs scheduled on its own
//! [`TaskQueue`], so runs never overlap and a newer run for a document supersedes
//! the older one.
//!
//! ```text
//! did_open / did_save / execute(doc)
//!        │  should_run? (language id, saved, file: resource)
//!        ▼
//!   Task(doc.key) ──► TaskQueue ──► body: spawn exec(linter --format compact ... file)
//!                                        │ stop handle = abort (kills the child)
//!                                        ▼
//!                        canceled? ── yes ──► drop results
//!                                        │ no
//!                                        ▼
//!          finish_with { report stderr, parse, sink.set(key, diagnostics) }
//! ```
//!
//! ## Rules
//! - Results of a canceled run are never published: publishing and completion are one
//!   step that `clear()` or a superseding run cannot interleave with.
//! - Configuration is read when a run is scheduled; later changes affect later runs only.
//! - Task bodies hold only a weak reference to the linter; dropping the last handle
//!   cancels everything still queued.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::core::{Config, TaskQueue};
use crate::error::LintError;
use crate::lint::args::{command_arguments, working_dir};
use crate::lint::config::LintConfig;
use crate::lint::document::{Diagnostic, Document, Severity, TextEdit};
use crate::lint::output::{parse_autocorrect, parse_compact};
use crate::lint::process::{ExecOutput, Invocation, exec};
use crate::lint::sink::DiagnosticSink;
use crate::subscribers::Subscribe;
use crate::tasks::{Task, TaskToken};

/// Exit code of a shell that could not find the command.
const COMMAND_NOT_FOUND: i32 = 127;

type OnComplete = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    config: RwLock<LintConfig>,
    sink: Arc<dyn DiagnosticSink>,
    queue: TaskQueue,
    additional_args: Vec<String>,
    workspace_root: Option<PathBuf>,
}

/// Builder for [`Linter`].
pub struct LinterBuilder {
    sink: Arc<dyn DiagnosticSink>,
    config: LintConfig,
    queue: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    additional_args: Vec<String>,
    workspace_root: Option<PathBuf>,
}

impl LinterBuilder {
    /// Creates a builder reporting to `sink`, with default settings.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            config: LintConfig::default(),
            queue: Config::default(),
            subscribers: Vec::new(),
            additional_args: Vec::new(),
            workspace_root: None,
        }
    }

    /// Sets the linter settings.
    pub fn with_config(mut self, config: LintConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the queue configuration (bus capacity, per-run timeout).
    pub fn with_queue_config(mut self, queue: Config) -> Self {
        self.queue = queue;
        self
    }

    /// Sets event subscribers attached to the queue's bus.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Extra arguments passed to every lint and correct run, before the file name.
    pub fn with_additional_args(mut self, args: Vec<String>) -> Self {
        self.additional_args = args;
        self
    }

    /// Workspace root: working directory of every run and base of a relative
    /// configuration file path. Without one, runs start in the document's directory.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Builds the linter.
    ///
    /// Must be called within a Tokio runtime when subscribers are set.
    pub fn build(self) -> Linter {
        Linter {
            inner: Arc::new(Inner {
                config: RwLock::new(self.config),
                sink: self.sink,
                queue: TaskQueue::new(self.queue, self.subscribers),
                additional_args: self.additional_args,
                workspace_root: self.workspace_root,
            }),
        }
    }
}

/// Cloneable handle to a linter and its queue.
#[derive(Clone)]
pub struct Linter {
    inner: Arc<Inner>,
}

impl Linter {
    /// Shortcut for `LinterBuilder::new(sink).build()`.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        LinterBuilder::new(sink).build()
    }

    pub fn builder(sink: Arc<dyn DiagnosticSink>) -> LinterBuilder {
        LinterBuilder::new(sink)
    }

    /// Snapshot of the current settings.
    pub fn config(&self) -> LintConfig {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the settings. Runs already scheduled keep the old ones.
    pub fn set_config(&self, config: LintConfig) {
        *self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
        tracing::debug!(target: "lintvisor", "linter settings reloaded");
    }

    /// Reloads the settings from the editor's JSON settings section.
    pub fn reload_settings(&self, settings: serde_json::Value) -> Result<(), LintError> {
        self.set_config(LintConfig::from_value(settings)?);
        Ok(())
    }

    /// True if documents should be linted on save.
    pub fn is_on_save(&self) -> bool {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .on_save
    }

    /// Queue the lint runs are scheduled on.
    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    /// True for saved `file:` documents in the configured language.
    pub fn should_run(&self, doc: &Document) -> bool {
        let language = self
            .inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .language_id
            .clone();
        doc.language_id == language && !doc.is_untitled && doc.key.is_file()
    }

    /// Lints `doc` and replaces its diagnostics.
    ///
    /// Returns the scheduled task, or `None` when the document is not eligible.
    pub fn execute(&self, doc: &Document) -> Result<Option<Task>, LintError> {
        self.execute_inner(doc, None)
    }

    /// Like [`execute`](Linter::execute), calling `on_complete` once the run has
    /// completed, successfully or not. Not called if the run is canceled.
    pub fn execute_then(
        &self,
        doc: &Document,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Result<Option<Task>, LintError> {
        self.execute_inner(doc, Some(Box::new(on_complete)))
    }

    fn execute_inner(
        &self,
        doc: &Document,
        on_complete: Option<OnComplete>,
    ) -> Result<Option<Task>, LintError> {
        if !self.should_run(doc) {
            return Ok(None);
        }
        self.schedule(doc, false, on_complete).map(Some)
    }

    /// Auto-corrects the file of `doc` in place, then lints it again.
    pub fn correct(&self, doc: &Document) -> Result<Option<Task>, LintError> {
        if !self.should_run(doc) {
            return Ok(None);
        }
        let linter = Arc::downgrade(&self.inner);
        let relint = doc.clone();
        let then: OnComplete = Box::new(move || {
            let Some(inner) = linter.upgrade() else {
                return;
            };
            if let Err(err) = (Linter { inner }).execute(&relint) {
                tracing::warn!(
                    target: "lintvisor",
                    key = %relint.key,
                    error = %err,
                    "re-lint after correction failed"
                );
            }
        });
        self.schedule(doc, true, Some(then)).map(Some)
    }

    /// Auto-corrects the text of `doc` through stdin and returns the edit replacing
    /// the whole document.
    ///
    /// Runs immediately, outside the queue. Exit status 1 (offenses left that could
    /// not be corrected) is accepted. Problems are also reported through the sink.
    pub async fn format(&self, doc: &Document) -> Result<Vec<TextEdit>, LintError> {
        let config = self.config();
        if doc.language_id != config.language_id {
            return Ok(Vec::new());
        }

        let cwd = working_dir(&doc.path, self.inner.workspace_root.as_deref());
        let mut args = command_arguments(&config, true, &cwd, self.inner.sink.as_ref());
        args.push("--stdin".to_string());
        args.push(doc.path.display().to_string());

        let inv = Invocation::new(&config, args, cwd).with_stdin(doc.text.clone());
        let out = exec(&inv).await.inspect_err(|err| self.inner.sink.warn(&err.to_string()))?;

        if !matches!(out.status, Some(0) | Some(1)) {
            self.inner.sink.warn("An error occurred during auto-correction");
            tracing::warn!(
                target: "lintvisor",
                status = ?out.status,
                stderr = %out.stderr,
                "auto-correction failed"
            );
            return Err(LintError::AutocorrectStatus { status: out.status });
        }

        let new_text = parse_autocorrect(&out.stdout)?;
        Ok(vec![TextEdit {
            range: doc.full_range(),
            new_text,
        }])
    }

    /// Cancels pending or running work for `doc` and removes its diagnostics.
    pub fn clear(&self, doc: &Document) {
        if !doc.key.is_file() {
            return;
        }
        let canceled = self.inner.queue.cancel(&doc.key);
        if canceled > 0 {
            tracing::debug!(target: "lintvisor", key = %doc.key, canceled, "cleared document");
        }
        self.inner.sink.delete(&doc.key);
    }

    /// Document opened in the editor.
    pub fn did_open(&self, doc: &Document) -> Result<Option<Task>, LintError> {
        self.execute(doc)
    }

    /// Document saved; lints it when `on_save` is enabled.
    pub fn did_save(&self, doc: &Document) -> Result<Option<Task>, LintError> {
        if !self.is_on_save() {
            return Ok(None);
        }
        self.execute(doc)
    }

    /// Document closed.
    pub fn did_close(&self, doc: &Document) {
        self.clear(doc);
    }

    fn schedule(
        &self,
        doc: &Document,
        autocorrect: bool,
        on_complete: Option<OnComplete>,
    ) -> Result<Task, LintError> {
        let config = self.config();
        let cwd = working_dir(&doc.path, self.inner.workspace_root.as_deref());

        let mut args = command_arguments(&config, autocorrect, &cwd, self.inner.sink.as_ref());
        args.extend(self.inner.additional_args.iter().cloned());
        args.push(doc.path.display().to_string());
        let inv = Invocation::new(&config, args, cwd);

        let run = Run {
            linter: Arc::downgrade(&self.inner),
            config,
            doc: doc.clone(),
            autocorrect,
            on_complete,
        };
        let task = Task::from_fn(doc.key.clone(), move |token: TaskToken| {
            tokio::spawn(run.execute(inv, token)).abort_handle()
        });

        self.inner.queue.enqueue(task.clone())?;
        Ok(task)
    }
}

/// Everything a lint body needs once the process has exited.
struct Run {
    linter: Weak<Inner>,
    config: LintConfig,
    doc: Document,
    autocorrect: bool,
    on_complete: Option<OnComplete>,
}

impl Run {
    async fn execute(self, inv: Invocation, token: TaskToken) {
        let result = exec(&inv).await;
        if token.is_canceled() {
            return;
        }
        let Some(inner) = self.linter.upgrade() else {
            token.fail("linter dropped");
            return;
        };

        let sink = inner.sink.as_ref();
        let reported = match result {
            Ok(out) => token.finish_with(|| {
                self.report_stderr(sink, &out);
                if !self.autocorrect {
                    self.publish(sink, &out.stdout);
                }
            }),
            Err(err) => {
                let reason = err.to_string();
                token.fail_with(reason.clone(), || sink.warn(&reason))
            }
        };
        drop(inner);
        if reported.is_none() {
            return;
        }

        if let Some(on_complete) = self.on_complete {
            on_complete();
        }
    }

    /// Forwards the linter's stderr to the user.
    fn report_stderr(&self, sink: &dyn DiagnosticSink, out: &ExecOutput) {
        let not_found = out.status == Some(COMMAND_NOT_FOUND);
        if not_found || (!out.stderr.is_empty() && !self.config.suppress_warnings) {
            sink.warn(&out.stderr);
        }
    }

    fn publish(&self, sink: &dyn DiagnosticSink, stdout: &str) {
        match parse_compact(&self.config.command(), stdout) {
            Ok(offenses) => {
                let diagnostics: Vec<Diagnostic> = offenses
                    .into_iter()
                    .map(|o| Diagnostic {
                        range: self.doc.line_range(o.line_index()),
                        message: o.message,
                        severity: Severity::Information,
                    })
                    .collect();
                tracing::debug!(
                    target: "lintvisor",
                    key = %self.doc.key,
                    offenses = diagnostics.len(),
                    "lint results"
                );
                sink.set(&self.doc.key, diagnostics);
            }
            Err(err) => sink.warn(&err.to_string()),
        }
    }
}

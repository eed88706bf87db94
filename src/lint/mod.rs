//! Lint collaborator: runs an external ERB linter and maps its findings to editor
//! diagnostics.
//!
//! - [`Linter`]: schedules runs on a [`TaskQueue`](crate::TaskQueue) and publishes results;
//! - [`LintConfig`]: settings decoded from the editor's JSON;
//! - [`DiagnosticSink`]: where results and warnings go ([`MemorySink`] keeps them in memory);
//! - [`parse_compact`] / [`parse_autocorrect`]: output parsers;
//! - [`exec`]: child process execution with kill-on-drop.

mod args;
mod config;
mod document;
mod linter;
mod output;
mod process;
mod sink;

pub use args::{command_arguments, working_dir};
pub use config::LintConfig;
pub use document::{Diagnostic, Document, Position, Range, Severity, TextEdit};
pub use linter::{Linter, LinterBuilder};
pub use output::{Offense, parse_autocorrect, parse_compact};
pub use process::{ExecOutput, Invocation, exec};
pub use sink::{DiagnosticSink, MemorySink};

//! Editor-agnostic document and diagnostic model.

use std::path::{Path, PathBuf};

use crate::tasks::ResourceKey;

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Diagnostic severity, mirroring the usual editor levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// One finding reported to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
}

/// Replacement of `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

/// Snapshot of an open document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Identity used for queueing and diagnostics.
    pub key: ResourceKey,
    /// Filesystem path handed to the linter.
    pub path: PathBuf,
    /// Editor language identifier (e.g. `html.erb`).
    pub language_id: String,
    /// True for never-saved buffers.
    pub is_untitled: bool,
    /// Current contents.
    pub text: String,
}

impl Document {
    /// Creates a saved document backed by `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        language_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            key: ResourceKey::from_path(&path),
            path,
            language_id: language_id.into(),
            is_untitled: false,
            text: text.into(),
        }
    }

    /// Overrides the resource key (e.g. with the editor's URI).
    pub fn with_key(mut self, key: impl Into<ResourceKey>) -> Self {
        self.key = key.into();
        self
    }

    /// Marks the document as an unsaved buffer.
    pub fn untitled(mut self) -> Self {
        self.is_untitled = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line_count(&self) -> u32 {
        // A trailing newline opens one more (empty) line, like editors count it.
        let n = self.text.split('\n').count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    /// Range covering `line` (zero-based) without its line break.
    ///
    /// Lines past the end collapse to an empty range at the start of that line.
    pub fn line_range(&self, line: u32) -> Range {
        let len = self
            .text
            .split('\n')
            .nth(line as usize)
            .map(|l| l.strip_suffix('\r').unwrap_or(l).encode_utf16().count())
            .unwrap_or(0);
        let end = u32::try_from(len).unwrap_or(u32::MAX);
        Range::new(Position::new(line, 0), Position::new(line, end))
    }

    /// Range covering the whole document.
    pub fn full_range(&self) -> Range {
        let last = self.line_count().saturating_sub(1);
        Range::new(Position::new(0, 0), self.line_range(last).end)
    }
}

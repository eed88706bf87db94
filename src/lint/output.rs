//! # Parsers for the linter's textual output.
//!
//! Compact report (`--format compact`):
//! ```text
//! Linting 1 files with 14 linters...
//!
//! app/views/a.html.erb:3:9: Extra space detected where there should be no space.
//! app/views/a.html.erb:7:1: Missing a trailing newline at the end of the file.
//!
//! 2 error(s) were found in ERB files
//! ```
//!
//! Auto-correction over stdin prints a report line, a separator of twenty `=` and then
//! the corrected source:
//! ```text
//! {"metadata": ...}
//! ====================
//! <div>corrected</div>
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::error::LintError;

static RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[^\r\n]*?\.erb:(?P<line>\d+):(?P<column>\d+): ").expect("record pattern")
});

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\d+ error\(s\) were found").expect("summary pattern")
});

static CORRECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^.*\n={20}\r?\n(?P<source>(?s:.*))").expect("autocorrect pattern")
});

const NO_ERRORS: &str = "No errors were found";

/// One finding of the compact report. `line` and `column` are one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offense {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Offense {
    /// Zero-based line index as used by editors.
    pub fn line_index(&self) -> u32 {
        self.line.saturating_sub(1)
    }
}

/// Parses a compact report into offenses.
///
/// - empty (or whitespace-only) output is an error: the command most likely did not run;
/// - a clean report (`No errors were found ...`) yields no offenses;
/// - every `<file>.erb:<line>:<column>: ` record starts an offense whose message runs up to
///   the next record or the closing summary line. Anything before the first record is
///   progress noise.
pub fn parse_compact(command: &str, output: &str) -> Result<Vec<Offense>, LintError> {
    if output.trim().is_empty() {
        return Err(LintError::EmptyOutput {
            command: command.to_string(),
        });
    }
    if output.contains(NO_ERRORS) {
        return Ok(Vec::new());
    }

    let records: Vec<_> = RECORD.captures_iter(output).collect();
    let mut offenses = Vec::with_capacity(records.len());

    for (i, caps) in records.iter().enumerate() {
        let (Some(head), Some(line), Some(column)) =
            (caps.get(0), caps.name("line"), caps.name("column"))
        else {
            continue;
        };
        let end = records
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(output.len(), |m| m.start());

        let mut message = &output[head.end()..end];
        if let Some(summary) = SUMMARY.find(message) {
            message = &message[..summary.start()];
        }

        offenses.push(Offense {
            line: line.as_str().parse().unwrap_or(1),
            column: column.as_str().parse().unwrap_or(1),
            message: message.trim().to_string(),
        });
    }
    Ok(offenses)
}

/// Extracts the corrected source from auto-correction output.
pub fn parse_autocorrect(output: &str) -> Result<String, LintError> {
    CORRECTED
        .captures(output)
        .and_then(|caps| caps.name("source"))
        .map(|m| m.as_str())
        .filter(|source| !source.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LintError::Autocorrect {
            output: output.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "Linting 1 files with 14 linters...\n\n\
        app/views/a.html.erb:3:9: Extra space detected where there should be no space.\n\
        app/views/a.html.erb:7:1: Missing a trailing newline\n  at the end of the file.\n\n\
        2 error(s) were found in ERB files\n";

    #[test]
    fn test_compact_report_yields_offenses() {
        let offenses = parse_compact("erblint", REPORT).unwrap();
        assert_eq!(
            offenses,
            vec![
                Offense {
                    line: 3,
                    column: 9,
                    message: "Extra space detected where there should be no space.".into(),
                },
                Offense {
                    line: 7,
                    column: 1,
                    message: "Missing a trailing newline\n  at the end of the file.".into(),
                },
            ]
        );
        assert_eq!(offenses[0].line_index(), 2);
    }

    #[test]
    fn test_location_inside_message_does_not_start_offense() {
        let out = "app/views/a.html.erb:4:2: Erb interpolation detected\n  \
            see config/erb_lint.rb:1:2: for details\n\n\
            1 error(s) were found in ERB files\n";
        let offenses = parse_compact("erblint", out).unwrap();
        assert_eq!(offenses.len(), 1);
        assert_eq!((offenses[0].line, offenses[0].column), (4, 2));
        assert_eq!(
            offenses[0].message,
            "Erb interpolation detected\n  see config/erb_lint.rb:1:2: for details"
        );
    }

    #[test]
    fn test_clean_report_yields_nothing() {
        let out = "Linting 1 files with 14 linters...\n\nNo errors were found in ERB files\n";
        assert!(parse_compact("erblint", out).unwrap().is_empty());
    }

    #[test]
    fn test_empty_output_is_an_error() {
        let err = parse_compact("bundle exec erblint", " \n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "command bundle exec erblint returns empty output! please check configuration."
        );
    }

    #[test]
    fn test_progress_only_output_has_no_offenses() {
        let offenses = parse_compact("erblint", "Linting 1 files with 14 linters...\n").unwrap();
        assert!(offenses.is_empty());
    }

    #[test]
    fn test_windows_paths_and_line_endings() {
        let out = "C:\\app\\a.html.erb:2:4: Trailing whitespace.\r\n";
        let offenses = parse_compact("erblint", out).unwrap();
        assert_eq!(offenses.len(), 1);
        assert_eq!((offenses[0].line, offenses[0].column), (2, 4));
        assert_eq!(offenses[0].message, "Trailing whitespace.");
    }

    #[test]
    fn test_corrected_source_follows_separator() {
        let out = "{\"metadata\":{}}\n====================\n<div>\n  ok\n</div>\n";
        assert_eq!(parse_autocorrect(out).unwrap(), "<div>\n  ok\n</div>\n");

        let crlf = "report\r\n====================\r\n<p></p>";
        assert_eq!(parse_autocorrect(crlf).unwrap(), "<p></p>");
    }

    #[test]
    fn test_missing_separator_is_an_error() {
        let err = parse_autocorrect("no separator here").unwrap_err();
        assert_eq!(err.as_label(), "lint_autocorrect_parse");

        assert!(parse_autocorrect("report\n====================\n").is_err());
    }
}

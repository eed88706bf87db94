//! Command-line construction for the external linter.

use std::path::{Path, PathBuf};

use crate::lint::config::LintConfig;
use crate::lint::sink::DiagnosticSink;

/// Builds the linter flags shared by lint, correct and format runs.
///
/// - always `--format compact`;
/// - `--config <path>` when `config_file_path` names an existing file (a relative path
///   is looked up from `cwd`, the directory the linter runs in);
/// - `--autocorrect` when `autocorrect` is set.
///
/// A missing configuration file is reported through `sink` and never aborts the run.
pub fn command_arguments(
    config: &LintConfig,
    autocorrect: bool,
    cwd: &Path,
    sink: &dyn DiagnosticSink,
) -> Vec<String> {
    let mut args = vec!["--format".to_string(), "compact".to_string()];

    if !config.config_file_path.is_empty() {
        if cwd.join(&config.config_file_path).is_file() {
            args.push("--config".to_string());
            args.push(config.config_file_path.clone());
        } else {
            sink.warn(&format!(
                "{} file does not exist. Ignoring...",
                config.config_file_path
            ));
        }
    }

    if autocorrect {
        args.push("--autocorrect".to_string());
    }
    args
}

/// Working directory for a run: the workspace root, else the file's directory.
pub fn working_dir(file: &Path, workspace_root: Option<&Path>) -> PathBuf {
    workspace_root
        .map(Path::to_path_buf)
        .or_else(|| file.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::sink::MemorySink;

    #[test]
    fn test_default_arguments() {
        let sink = MemorySink::new();
        let cwd = std::env::temp_dir();

        let args = command_arguments(&LintConfig::default(), false, &cwd, &sink);
        assert_eq!(args, ["--format", "compact"]);

        let args = command_arguments(&LintConfig::default(), true, &cwd, &sink);
        assert_eq!(args, ["--format", "compact", "--autocorrect"]);
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn test_missing_config_file_is_ignored_with_warning() {
        let ws = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        let cfg = LintConfig {
            config_file_path: "does-not-exist.yml".into(),
            ..LintConfig::default()
        };

        let args = command_arguments(&cfg, false, ws.path(), &sink);
        assert_eq!(args, ["--format", "compact"]);
        assert_eq!(
            sink.warnings(),
            ["does-not-exist.yml file does not exist. Ignoring..."]
        );
    }

    #[test]
    fn test_relative_config_file_found_from_working_dir() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::write(ws.path().join(".erb-lint.yml"), "---\n").unwrap();

        let sink = MemorySink::new();
        let cfg = LintConfig {
            config_file_path: ".erb-lint.yml".into(),
            ..LintConfig::default()
        };

        let args = command_arguments(&cfg, true, ws.path(), &sink);
        assert_eq!(
            args,
            ["--format", "compact", "--config", ".erb-lint.yml", "--autocorrect"]
        );
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn test_absolute_config_file_is_kept() {
        let ws = tempfile::tempdir().unwrap();
        let file = ws.path().join("lint.yml");
        std::fs::write(&file, "").unwrap();
        let absolute = file.display().to_string();

        let sink = MemorySink::new();
        let cfg = LintConfig {
            config_file_path: absolute.clone(),
            ..LintConfig::default()
        };

        let args = command_arguments(&cfg, false, &std::env::temp_dir(), &sink);
        assert_eq!(args[2..], ["--config".to_string(), absolute]);
    }

    #[test]
    fn test_working_dir_prefers_workspace_root() {
        let file = Path::new("/app/views/a.html.erb");
        assert_eq!(working_dir(file, None), PathBuf::from("/app/views"));
        assert_eq!(
            working_dir(file, Some(Path::new("/app"))),
            PathBuf::from("/app")
        );
    }
}

//! # Linter settings.
//!
//! [`LintConfig`] mirrors the editor's settings section for the linter. It is
//! decoded from the settings JSON with camelCase keys; missing keys fall back to
//! [`LintConfig::default`].
//!
//! ```json
//! {
//!   "executePath": "/usr/local/bin/",
//!   "onSave": true,
//!   "configFilePath": ".erb-lint.yml",
//!   "suppressERBLintWarnings": false
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::LintError;

/// Settings of the external linter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintConfig {
    /// Executable name (joined to `execute_path`, or run through `bundle exec`).
    pub executable: String,

    /// Directory holding the executable, with trailing separator.
    ///
    /// Empty means "run `bundle exec <executable>` through the shell".
    pub execute_path: String,

    /// Lint documents when they are saved.
    pub on_save: bool,

    /// Linter configuration file passed with `--config`; empty for none.
    pub config_file_path: String,

    /// Hide the linter's stderr unless the command itself could not run.
    #[serde(alias = "suppressERBLintWarnings")]
    pub suppress_warnings: bool,

    /// Only documents with this language id are linted.
    pub language_id: String,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            executable: "erblint".to_string(),
            execute_path: String::new(),
            on_save: true,
            config_file_path: String::new(),
            suppress_warnings: true,
            language_id: "html.erb".to_string(),
        }
    }
}

impl LintConfig {
    /// Decodes settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self, LintError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decodes settings from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, LintError> {
        Ok(serde_json::from_value(value)?)
    }

    /// True when the command goes through the platform shell (`bundle exec`).
    #[inline]
    pub fn uses_shell(&self) -> bool {
        self.execute_path.is_empty()
    }

    /// Command as shown to the user and, in shell mode, as run.
    pub fn command(&self) -> String {
        if self.uses_shell() {
            format!("bundle exec {}", self.executable)
        } else {
            format!("{}{}", self.execute_path, self.executable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let cfg = LintConfig::default();
        assert_eq!(cfg.executable, "erblint");
        assert_eq!(cfg.execute_path, "");
        assert!(cfg.on_save);
        assert_eq!(cfg.config_file_path, "");
        assert!(cfg.suppress_warnings);
        assert_eq!(cfg.language_id, "html.erb");
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let cfg = LintConfig::from_json("{}").unwrap();
        assert_eq!(cfg, LintConfig::default());
        assert!(cfg.uses_shell());
        assert_eq!(cfg.command(), "bundle exec erblint");
    }

    #[test]
    fn test_editor_settings_are_decoded() {
        let cfg = LintConfig::from_json(
            r#"{
                "executePath": "/opt/bin/",
                "onSave": false,
                "configFilePath": ".erb-lint.yml",
                "suppressERBLintWarnings": false
            }"#,
        )
        .unwrap();

        assert!(!cfg.on_save);
        assert!(!cfg.suppress_warnings);
        assert_eq!(cfg.config_file_path, ".erb-lint.yml");
        assert!(!cfg.uses_shell());
        assert_eq!(cfg.command(), "/opt/bin/erblint");
    }

    #[test]
    fn test_invalid_settings_are_reported() {
        let err = LintConfig::from_json(r#"{"onSave": "yes"}"#).unwrap_err();
        assert_eq!(err.as_label(), "lint_settings");
    }
}

//! # Child process execution.
//!
//! [`exec`] runs one linter invocation to completion and captures its output.
//! The child is spawned with `kill_on_drop`, so dropping (or aborting) the future
//! kills the process. This is what a task's stop handle relies on.
//!
//! Two launch modes:
//! - **direct**: `program args...` via `execve`;
//! - **shell**: a single command line through `sh -c` (or `cmd /C` on Windows), used
//!   for `bundle exec <executable>`. Arguments are quoted for the shell.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::LintError;
use crate::lint::config::LintConfig;

/// One prepared linter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program (direct mode) or command prefix (shell mode).
    pub program: String,
    pub args: Vec<String>,
    /// Run through the platform shell.
    pub shell: bool,
    pub cwd: PathBuf,
    /// Text written to the child's stdin; `None` leaves stdin closed.
    pub stdin: Option<String>,
}

impl Invocation {
    /// Prepares an invocation of the configured linter.
    pub fn new(config: &LintConfig, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: config.command(),
            args,
            shell: config.uses_shell(),
            cwd: cwd.into(),
            stdin: None,
        }
    }

    /// Feeds `text` to the child's stdin.
    pub fn with_stdin(mut self, text: impl Into<String>) -> Self {
        self.stdin = Some(text.into());
        self
    }

    /// Full command line as the shell would see it.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        if self.shell {
            let line = self.command_line();
            if cfg!(windows) {
                let mut cmd = Command::new("cmd");
                cmd.arg("/C").arg(line);
                cmd
            } else {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
        } else {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.args);
            cmd
        }
    }
}

/// Captured result of a finished child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs `inv` to completion.
///
/// # Errors
/// - [`LintError::NotExecutable`] if the program is missing or not executable;
/// - [`LintError::Spawn`] for any other I/O failure.
///
/// A non-zero exit status is not an error; callers inspect [`ExecOutput::status`].
pub async fn exec(inv: &Invocation) -> Result<ExecOutput, LintError> {
    let mut cmd = inv.command();
    cmd.current_dir(&inv.cwd)
        .stdin(if inv.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(command = %inv.command_line(), cwd = %inv.cwd.display(), "spawning linter");
    let mut child = cmd.spawn().map_err(|err| spawn_error(inv, err))?;

    let pipe = child.stdin.take();
    let input = inv.stdin.clone();
    let feed = async move {
        if let (Some(mut pipe), Some(input)) = (pipe, input) {
            // The child may exit without reading everything; its output still counts.
            if let Err(err) = pipe.write_all(input.as_bytes()).await {
                tracing::debug!(error = %err, "linter closed stdin early");
            }
        }
    };

    let (_, output) = tokio::join!(feed, child.wait_with_output());
    let output = output.map_err(|err| spawn_error(inv, err))?;

    Ok(ExecOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn spawn_error(inv: &Invocation, err: io::Error) -> LintError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => LintError::NotExecutable {
            command: inv.program.clone(),
        },
        _ => LintError::Spawn {
            command: inv.program.clone(),
            source: err,
        },
    }
}

/// Quotes `arg` for the platform shell when it contains special characters.
fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%\\".contains(c));
    if plain {
        return arg.to_string();
    }
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(line: &str) -> Invocation {
        Invocation {
            program: line.to_string(),
            args: Vec::new(),
            shell: true,
            cwd: std::env::temp_dir(),
            stdin: None,
        }
    }

    #[test]
    fn test_shell_arguments_are_quoted() {
        let inv = Invocation {
            args: vec!["--format".into(), "compact".into(), "/tmp/my file's.erb".into()],
            ..sh("bundle exec erblint")
        };
        assert_eq!(
            inv.command_line(),
            r"bundle exec erblint --format compact '/tmp/my file'\''s.erb'"
        );
    }

    #[tokio::test]
    async fn test_captures_status_and_streams() {
        let out = exec(&sh("echo out; echo err >&2; exit 3")).await.unwrap();
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let out = exec(&sh("cat").with_stdin("<p>hi</p>")).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_missing_program_is_not_executable() {
        let inv = Invocation {
            program: "/nonexistent/erblint".into(),
            args: Vec::new(),
            shell: false,
            cwd: std::env::temp_dir(),
            stdin: None,
        };
        let err = exec(&inv).await.unwrap_err();
        assert_eq!(err.to_string(), "/nonexistent/erblint is not executable");
    }
}

//! External process execution.
//!
//! A non-zero exit is a normal, inspectable result, not an error. Spawn
//! failures (missing binary, permission denied) are folded into an
//! unsuccessful [`CommandOutput`] so callers handle one failure shape.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Result of a captured command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output with trailing whitespace and leading blank lines
    /// removed. Leading spaces of the first line are kept: porcelain status
    /// output is column-aligned.
    pub stdout: String,
    /// Standard error, fully trimmed.
    pub stderr: String,
    /// Exit status was zero.
    pub success: bool,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }

    /// Stdout if the command succeeded.
    pub fn ok_stdout(self) -> Option<String> {
        self.success.then_some(self.stdout)
    }
}

/// Seam between the pipeline and the operating system.
pub trait CommandRunner {
    /// Run to completion, capturing output.
    fn run(&self, argv: &[&str]) -> CommandOutput;

    /// Run to completion with inherited stdin/stdout/stderr; returns whether
    /// the exit status was zero.
    fn run_live(&self, argv: &[&str]) -> bool;
}

/// Trim for captured stdout; see [`CommandOutput::stdout`].
pub fn trim_output(raw: &str) -> String {
    raw.trim_end().trim_start_matches(&['\n', '\r'][..]).to_owned()
}

// ---------------------------------------------------------------------------
// SystemRunner
// ---------------------------------------------------------------------------

/// [`CommandRunner`] backed by `std::process::Command`, pinned to a working
/// directory so the process never needs to `chdir`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    workdir: PathBuf,
}

impl SystemRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command(&self, argv: &[&str]) -> Option<Command> {
        let (program, args) = argv.split_first()?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.workdir);
        Some(cmd)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[&str]) -> CommandOutput {
        let joined = argv.join(" ");
        tracing::debug!(cmd = %joined, "run");
        let Some(mut cmd) = self.command(argv) else {
            return CommandOutput::failed("empty command");
        };
        cmd.stdin(Stdio::null());

        match cmd.output() {
            Ok(out) => {
                let result = CommandOutput {
                    stdout: trim_output(&String::from_utf8_lossy(&out.stdout)),
                    stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
                    success: out.status.success(),
                };
                if !result.success {
                    tracing::debug!(cmd = %joined, status = %out.status, stderr = %result.stderr, "command failed");
                }
                result
            }
            Err(err) => {
                tracing::warn!(cmd = %joined, error = %err, "failed to spawn");
                CommandOutput::failed(err.to_string())
            }
        }
    }

    fn run_live(&self, argv: &[&str]) -> bool {
        let joined = argv.join(" ");
        tracing::debug!(cmd = %joined, "run (live)");
        let Some(mut cmd) = self.command(argv) else {
            return false;
        };
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        match cmd.status() {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::warn!(cmd = %joined, error = %err, "failed to spawn");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_keeps_first_column() {
        assert_eq!(trim_output(" M a.nix\n?? b.nix\n\n"), " M a.nix\n?? b.nix");
        assert_eq!(trim_output("\n\nvalue  \n"), "value");
        assert_eq!(trim_output(""), "");
    }

    #[test]
    fn empty_argv_is_unsuccessful() {
        let runner = SystemRunner::new(".");
        let out = runner.run(&[]);
        assert!(!out.success);
        assert!(!runner.run_live(&[]));
    }

    #[test]
    fn ok_stdout_respects_success() {
        assert_eq!(CommandOutput::ok("x").ok_stdout().as_deref(), Some("x"));
        assert_eq!(CommandOutput::failed("boom").ok_stdout(), None);
    }
}

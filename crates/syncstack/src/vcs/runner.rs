//! Subprocess boundary for the version-control binary.

use std::fmt;
use std::path::Path;
use std::process::Command;

/// Captured result of a VCS command that ran to completion.
///
/// A nonzero `exit_code` is a normal command failure, not a runner failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns true if the command exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed stdout.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// The VCS binary could not be started at all (missing binary, bad working
/// directory, permission error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnFailure {
    pub reason: String,
}

impl fmt::Display for SpawnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not start git: {}", self.reason)
    }
}

/// Outcome of one runner invocation. Never panics, never raises: both the
/// absent-tool case and command failures are values.
pub type RunOutcome = std::result::Result<ProcessOutput, SpawnFailure>;

/// Invokes the version-control binary against a working directory.
///
/// Mutating subcommands change the working copy on disk; `fetch` changes
/// local metadata only.
pub trait VcsRunner: Send + Sync {
    fn run(&self, working_dir: &Path, args: &[&str]) -> RunOutcome;
}

/// Runs the real `git` executable as a child process.
#[derive(Debug, Clone)]
pub struct GitProcessRunner {
    binary: String,
}

impl GitProcessRunner {
    /// Creates a runner for the given executable name or path.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for GitProcessRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl VcsRunner for GitProcessRunner {
    fn run(&self, working_dir: &Path, args: &[&str]) -> RunOutcome {
        log::debug!("git {} (in {})", args.join(" "), working_dir.display());

        let output = Command::new(&self.binary)
            .current_dir(working_dir)
            .args(args)
            // Never block on an interactive credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| SpawnFailure {
                reason: e.to_string(),
            })?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_binary_is_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let runner = GitProcessRunner::new("definitely-not-a-real-vcs-binary");

        let outcome = runner.run(dir.path(), &["status"]);
        let failure = outcome.unwrap_err();
        assert!(failure.to_string().starts_with("could not start git"));
    }

    #[test]
    fn test_nonzero_exit_is_not_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let runner = GitProcessRunner::default();

        // Not a repository: git runs and exits nonzero.
        let output = runner
            .run(dir.path(), &["rev-parse", "--verify", "HEAD"])
            .unwrap();
        assert!(!output.success());
        assert!(!output.stderr.is_empty());
    }

    #[test]
    fn test_version_succeeds() {
        let dir = TempDir::new().unwrap();
        let output = GitProcessRunner::default()
            .run(dir.path(), &["--version"])
            .unwrap();
        assert!(output.success());
        assert!(output.stdout_trimmed().starts_with("git version"));
    }
}

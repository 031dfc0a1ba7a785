//! In-memory runner double for call-order tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::runner::{ProcessOutput, RunOutcome, SpawnFailure, VcsRunner};

/// Answers commands from a script of `(argument prefix, outcome)` rules and
/// records every invocation. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(Vec<String>, RunOutcome)>,
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, prefix: &[&str], stdout: &str) -> Self {
        self.respond(prefix, 0, stdout, "")
    }

    pub fn fail(self, prefix: &[&str], stderr: &str) -> Self {
        self.respond(prefix, 1, "", stderr)
    }

    pub fn absent(mut self, prefix: &[&str]) -> Self {
        self.rules.push((
            to_owned(prefix),
            Err(SpawnFailure {
                reason: "No such file or directory (os error 2)".to_string(),
            }),
        ));
        self
    }

    pub fn respond(mut self, prefix: &[&str], exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.push((
            to_owned(prefix),
            Ok(ProcessOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
        ));
        self
    }

    /// Argument vectors in invocation order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, args)| args.clone())
            .collect()
    }

    /// Index of the first call whose arguments start with `prefix`.
    pub fn position(&self, prefix: &[&str]) -> Option<usize> {
        self.calls().iter().position(|args| starts_with(args, prefix))
    }

    pub fn called(&self, prefix: &[&str]) -> bool {
        self.position(prefix).is_some()
    }
}

impl VcsRunner for ScriptedRunner {
    fn run(&self, working_dir: &Path, args: &[&str]) -> RunOutcome {
        let owned = to_owned(args);
        self.calls
            .lock()
            .unwrap()
            .push((working_dir.to_path_buf(), owned.clone()));

        self.rules
            .iter()
            .find(|(prefix, _)| starts_with(&owned, &prefix.iter().map(String::as_str).collect::<Vec<_>>()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| {
                Ok(ProcessOutput {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            })
    }
}

fn to_owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn starts_with(args: &[String], prefix: &[&str]) -> bool {
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p)
}

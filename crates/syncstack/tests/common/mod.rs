//! Shared fixtures for syncstack integration tests.
//!
//! `GitFixture` owns a temporary directory holding bare "remote" repositories
//! and an upstream clone used to push new commits to them, so tests can
//! drive the real `git` binary without network access.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use secrecy::SecretString;
use tempfile::TempDir;

use syncstack::{EngineConfig, SyncEngine};

/// Runs git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=Fixture",
            "-c",
            "user.email=fixture@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("failed to run git");

    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Gives a working copy a local identity so merges and rebases can commit.
pub fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Working Copy"]);
    git(dir, &["config", "user.email", "wc@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

pub fn write_file(dir: &Path, file: &str, content: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    std::fs::write(path, content).expect("failed to write file");
}

pub fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
}

pub fn head(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"])
}

pub fn no_credential() -> SecretString {
    SecretString::from(String::new())
}

/// Temporary bare remotes plus an upstream clone per remote.
pub struct GitFixture {
    temp_dir: TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory for engine working copies.
    pub fn workspace(&self) -> PathBuf {
        let dir = self.root().join("workspace");
        std::fs::create_dir_all(&dir).expect("failed to create workspace");
        dir
    }

    /// Creates bare remote `<name>.git` with one commit on `main` and returns
    /// its path, which doubles as the clone URL.
    pub fn remote(&self, name: &str) -> PathBuf {
        let bare = self.root().join("remotes").join(format!("{}.git", name));
        std::fs::create_dir_all(&bare).expect("failed to create remote dir");
        git(&bare, &["init", "-q", "--bare"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let upstream = self.upstream(name);
        std::fs::create_dir_all(&upstream).expect("failed to create upstream dir");
        git(&upstream, &["init", "-q"]);
        git(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        write_file(&upstream, "README.md", "# fixture\n");
        commit_all(&upstream, "Initial commit");
        git(&upstream, &["remote", "add", "origin", &path_str(&bare)]);
        git(&upstream, &["push", "-q", "-u", "origin", "main"]);

        bare
    }

    /// The upstream clone of remote `name`, used to publish new commits.
    pub fn upstream(&self, name: &str) -> PathBuf {
        self.root().join("upstream").join(name)
    }

    /// Commits `content` to `file` upstream and pushes it.
    pub fn push_upstream(&self, name: &str, file: &str, content: &str, message: &str) {
        let upstream = self.upstream(name);
        write_file(&upstream, file, content);
        commit_all(&upstream, message);
        git(&upstream, &["push", "-q", "origin", "main"]);
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            workspace_root: self.workspace(),
            ..EngineConfig::default()
        }
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::from_config(&self.config())
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

//! Git output parsing helpers.

use super::runner::ProcessOutput;
use crate::engine::types::{ChangeKind, CommitInfo};

/// Field separator used in `git log --format` strings.
pub const LOG_FIELD_SEPARATOR: char = '\u{1f}';

/// Formats a git error with both stdout and stderr for better debugging.
pub fn format_git_error(output: &ProcessOutput) -> String {
    let stderr = output.stderr.trim();
    let stdout = output.stdout.trim();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!("Command failed with exit code {}", output.exit_code),
        (true, false) => stdout.to_string(),
        (false, true) => stderr.to_string(),
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// Counts the non-empty lines of `git status --porcelain` output.
pub fn count_porcelain_entries(output: &str) -> usize {
    output.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Parses `git rev-list --left-right --count A...B` output into `(left, right)`.
pub fn parse_left_right_counts(output: &str) -> Option<(u32, u32)> {
    let mut parts = output.split_whitespace();
    let left = parts.next()?.parse().ok()?;
    let right = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((left, right))
}

/// One entry of `git status --porcelain -z` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PorcelainEntry {
    /// Two-character `XY` status code.
    pub code: String,
    /// Current path (the destination for renames and copies).
    pub path: String,
}

impl PorcelainEntry {
    pub fn kind(&self) -> ChangeKind {
        classify_status_code(&self.code)
    }
}

/// Maps a porcelain `XY` code onto the four change kinds reported upward.
///
/// Renames, copies, type changes and unmerged paths all count as modified.
pub fn classify_status_code(code: &str) -> ChangeKind {
    if code == "??" {
        return ChangeKind::Untracked;
    }
    if code.contains('A') {
        ChangeKind::Added
    } else if code.contains('D') {
        ChangeKind::Deleted
    } else {
        ChangeKind::Modified
    }
}

/// Parses NUL-separated `git status --porcelain -z` output.
pub fn parse_porcelain_z(output: &str) -> Vec<PorcelainEntry> {
    let mut entries = Vec::new();
    let mut records = output.split('\0');

    while let Some(record) = records.next() {
        let (Some(code), Some(path)) = (record.get(..2), record.get(3..)) else {
            continue;
        };
        if path.is_empty() {
            continue;
        }
        let code = code.to_string();
        let path = path.to_string();

        // Renames and copies carry the original path as the next record.
        if code.starts_with('R') || code.starts_with('C') {
            records.next();
        }

        if code == "!!" {
            continue;
        }

        entries.push(PorcelainEntry { code, path });
    }

    entries
}

/// Parses the first line of `git diff --numstat` into `(additions, deletions)`.
/// Binary files report `-` for both and count as zero.
pub fn parse_numstat(output: &str) -> (u32, u32) {
    let Some(line) = output.lines().find(|l| !l.trim().is_empty()) else {
        return (0, 0);
    };

    let mut fields = line.split('\t');
    let additions = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
    let deletions = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
    (additions, deletions)
}

/// `--format` argument matching [`parse_log`].
pub fn log_format_arg() -> String {
    format!(
        "--format=%h{sep}%an{sep}%ae{sep}%at{sep}%s",
        sep = "%x1f"
    )
}

/// Parses `git log` output produced with [`log_format_arg`].
pub fn parse_log(output: &str) -> Vec<CommitInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(5, LOG_FIELD_SEPARATOR);
            let hash = fields.next()?.trim();
            if hash.is_empty() {
                return None;
            }
            let author = fields.next()?;
            let email = fields.next()?;
            let timestamp = fields.next()?.trim().parse().ok()?;
            let subject = fields.next().unwrap_or_default();

            Some(CommitInfo {
                hash: hash.to_string(),
                author: author.to_string(),
                email: email.to_string(),
                timestamp,
                subject: subject.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_format_git_error_empty_output() {
        assert_eq!(
            format_git_error(&output(1, "", "")),
            "Command failed with exit code 1"
        );
    }

    #[test]
    fn test_format_git_error_stderr_only() {
        assert_eq!(
            format_git_error(&output(128, "", "fatal: not a git repository\n")),
            "fatal: not a git repository"
        );
    }

    #[test]
    fn test_format_git_error_both() {
        assert_eq!(
            format_git_error(&output(1, "some output", "some error")),
            "some error\nsome output"
        );
    }

    #[test]
    fn test_count_porcelain_entries() {
        assert_eq!(count_porcelain_entries(""), 0);
        assert_eq!(count_porcelain_entries(" M src/lib.rs\n?? notes.txt\n"), 2);
        assert_eq!(count_porcelain_entries("\n\n"), 0);
    }

    #[test]
    fn test_parse_left_right_counts() {
        assert_eq!(parse_left_right_counts("3\t2\n"), Some((3, 2)));
        assert_eq!(parse_left_right_counts("0\t0"), Some((0, 0)));
        assert_eq!(parse_left_right_counts(""), None);
        assert_eq!(parse_left_right_counts("fatal: bad revision"), None);
        assert_eq!(parse_left_right_counts("1 2 3"), None);
    }

    #[test]
    fn test_classify_status_code() {
        assert_eq!(classify_status_code("??"), ChangeKind::Untracked);
        assert_eq!(classify_status_code("A "), ChangeKind::Added);
        assert_eq!(classify_status_code(" D"), ChangeKind::Deleted);
        assert_eq!(classify_status_code(" M"), ChangeKind::Modified);
        assert_eq!(classify_status_code("MM"), ChangeKind::Modified);
        assert_eq!(classify_status_code("R "), ChangeKind::Modified);
        assert_eq!(classify_status_code("UU"), ChangeKind::Modified);
    }

    #[test]
    fn test_parse_porcelain_z_with_rename_and_spaces() {
        let raw = " M src/main.rs\0R  new name.txt\0old name.txt\0?? docs/a b.md\0";
        let entries = parse_porcelain_z(raw);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "src/main.rs");
        assert_eq!(entries[0].kind(), ChangeKind::Modified);
        assert_eq!(entries[1].path, "new name.txt");
        assert_eq!(entries[1].code, "R ");
        assert_eq!(entries[2].path, "docs/a b.md");
        assert_eq!(entries[2].kind(), ChangeKind::Untracked);
    }

    #[test]
    fn test_parse_numstat() {
        assert_eq!(parse_numstat("12\t3\tsrc/lib.rs\n"), (12, 3));
        assert_eq!(parse_numstat("-\t-\tlogo.png\n"), (0, 0));
        assert_eq!(parse_numstat(""), (0, 0));
    }

    #[test]
    fn test_parse_log() {
        let raw = "abc1234\u{1f}Ada\u{1f}ada@example.com\u{1f}1700000000\u{1f}Fix: handle a|b\n\
                   def5678\u{1f}Bob\u{1f}bob@example.com\u{1f}1690000000\u{1f}\n";
        let commits = parse_log(raw);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "abc1234");
        assert_eq!(commits[0].author, "Ada");
        assert_eq!(commits[0].timestamp, 1_700_000_000);
        assert_eq!(commits[0].subject, "Fix: handle a|b");
        assert_eq!(commits[1].subject, "");
    }

    #[test]
    fn test_parse_log_skips_malformed_lines() {
        assert!(parse_log("not a log line\n").is_empty());
    }
}

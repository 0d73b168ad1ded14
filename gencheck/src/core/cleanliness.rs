//! Classification of version-control status output.
//!
//! Rules:
//! - Empty `git status --porcelain` output means the tree is clean.
//! - Any other output, whitespace included, means dirty; the raw text is kept.
//! - A failed status query whose stderr carries the "not a git repository"
//!   marker means the directory is not under version control. Every other
//!   failure is reported as a command failure.

use crate::error::CheckError;

const NOT_A_REPO_MARKER: &str = "not a git repository";

/// Outcome of the preflight status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanlinessResult {
    Clean,
    /// Raw status output listing uncommitted changes.
    Dirty(String),
}

impl CleanlinessResult {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

/// Classify the stdout of a successful status query.
pub fn classify_status(stdout: &str) -> CleanlinessResult {
    if stdout.is_empty() {
        CleanlinessResult::Clean
    } else {
        CleanlinessResult::Dirty(stdout.to_string())
    }
}

/// Classify a status query that exited unsuccessfully.
pub fn classify_status_failure(exit_code: Option<i32>, stderr: &str) -> CheckError {
    let stderr = stderr.trim();
    let detail = match (exit_code, stderr.is_empty()) {
        (Some(code), true) => format!("git status exited with code {code}"),
        (None, true) => "git status terminated by signal".to_string(),
        (_, false) => stderr.to_string(),
    };
    if stderr.contains(NOT_A_REPO_MARKER) {
        CheckError::NotAVersionedRepo(detail)
    } else {
        CheckError::CommandFailed(detail)
    }
}

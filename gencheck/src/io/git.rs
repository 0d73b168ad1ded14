//! Git adapter for the preflight cleanliness check.
//!
//! The harness only ever asks git one question, whether the working tree has
//! uncommitted changes, so the wrapper stays small and explicit.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, instrument, warn};

use crate::core::cleanliness::{CleanlinessResult, classify_status, classify_status_failure};
use crate::error::CheckError;

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Answers whether a working directory is free of uncommitted changes.
pub trait CleanlinessChecker {
    fn check_clean(&self, workdir: &Path) -> Result<CleanlinessResult, CheckError>;
}

/// Checker backed by `git status --porcelain`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCleanlinessChecker;

impl CleanlinessChecker for GitCleanlinessChecker {
    fn check_clean(&self, workdir: &Path) -> Result<CleanlinessResult, CheckError> {
        Git::new(workdir).status()
    }
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Query `git status --porcelain` and classify the result.
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn status(&self) -> Result<CleanlinessResult, CheckError> {
        let output = self.run(&["status", "--porcelain"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err = classify_status_failure(output.status.code(), &stderr);
            warn!(err = %err, "git status failed");
            return Err(err);
        }
        let result = classify_status(&String::from_utf8_lossy(&output.stdout));
        debug!(clean = result.is_clean(), "git status classified");
        Ok(result)
    }

    fn run(&self, args: &[&str]) -> Result<Output, CheckError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| CheckError::CommandFailed(format!("spawn git {}: {e}", args.join(" "))))
    }
}

/// Parse raw porcelain output into entries, skipping lines that do not parse.
pub fn parse_status_entries(raw: &str) -> Vec<StatusEntry> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_status_line)
        .collect()
}

fn parse_status_line(line: &str) -> Option<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Some(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 || !line.is_char_boundary(2) || !line.is_char_boundary(3) {
        return None;
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Some(StatusEntry { code, path })
}

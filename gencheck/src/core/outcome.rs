//! Terminal outcomes of a harness run.

use std::fmt;
use std::path::PathBuf;

use crate::core::diff::DiffReport;
use crate::core::snapshot::Snapshot;
use crate::core::types::GenerationRun;

/// Why a run ended without passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Required environment or config file is missing or invalid.
    Configuration,
    /// Repository is dirty or its status could not be queried.
    Precondition,
    /// The artifact could not be read at some snapshot point.
    SetupReadFailure,
    /// The generator failed to start or exited non-zero.
    GeneratorCrashed(GenerationRun),
    /// The second run changed the artifact.
    NonIdempotent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => f.write_str("configuration"),
            Self::Precondition => f.write_str("precondition"),
            Self::SetupReadFailure => f.write_str("setup read failure"),
            Self::GeneratorCrashed(run) => write!(f, "generator crashed ({run})"),
            Self::NonIdempotent => f.write_str("non-idempotent"),
        }
    }
}

/// Everything captured by a run that reached the verify stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotenceReport {
    pub artifact: PathBuf,
    pub initial: Snapshot,
    pub after_first: Snapshot,
    pub after_second: Snapshot,
    /// `initial` -> `after_first`.
    pub first_diff: DiffReport,
    /// `after_first` -> `after_second`.
    pub second_diff: DiffReport,
}

impl IdempotenceReport {
    /// The verdict: the second run must be a no-op.
    pub fn is_idempotent(&self) -> bool {
        self.after_first == self.after_second
    }

    /// Whether the first run rewrote the artifact (allowed).
    pub fn first_run_changed(&self) -> bool {
        self.initial != self.after_first
    }
}

/// A report whose second run diverged from the first.
///
/// Its `Display` carries the full diagnostic dump: both diffs and all three
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence(pub IdempotenceReport);

impl Divergence {
    pub fn report(&self) -> &IdempotenceReport {
        &self.0
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.0;
        let path = report.artifact.display();
        writeln!(
            f,
            "{path} content differs after two generator runs (-first +second):"
        )?;
        writeln!(f, "{}", report.second_diff)?;
        writeln!(f, "diff after first run (-initial +first):\n{}", report.first_diff)?;
        writeln!(f, "initial {path} content:\n{}", report.initial)?;
        writeln!(f, "first run {path} content:\n{}", report.after_first)?;
        write!(f, "second run {path} content:\n{}", report.after_second)
    }
}

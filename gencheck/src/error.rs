//! Error taxonomy for a harness run.
//!
//! Every error is terminal: nothing is retried or recovered. Each variant
//! carries enough context (path, run, raw status) to investigate by hand.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::outcome::{Divergence, FailureKind};
use crate::core::types::{GenerationRun, SnapshotPoint};

/// Invalid or missing harness configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} environment variable not set; it must name the source repository root")]
    MissingEnv { var: &'static str },
    #[error("{var} must be an absolute path, got {}", .path.display())]
    RelativeWorkingDir { var: &'static str, path: PathBuf },
    #[error("artifact_path must be relative to the repository root, got {}", .path.display())]
    AbsoluteArtifact { path: PathBuf },
    #[error("artifact_path must not be empty")]
    EmptyArtifact,
    #[error("generator.command must be a non-empty array")]
    EmptyCommand,
    #[error("read config {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure to query version-control status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("not a git repository: {0}")]
    NotAVersionedRepo(String),
    #[error("failed to execute git status: {0}")]
    CommandFailed(String),
}

/// The repository is not in a state the check can start from.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("this check must run in a git directory with no diffs; status:\n{status}")]
    Dirty { status: String },
    #[error("error running git status in {}", .workdir.display())]
    Check {
        workdir: PathBuf,
        #[source]
        source: CheckError,
    },
}

/// The artifact could not be captured.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("artifact {} not found", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read artifact {}", .path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The generator could not be started or did not succeed.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for {program}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to forward {program} output")]
    Forward {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {}", exit_detail(.code))]
    NonZeroExit { program: String, code: Option<i32> },
}

fn exit_detail(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Terminal failure of [`crate::verify::verify_idempotence`].
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("precondition failed")]
    Precondition(#[from] PreconditionError),
    #[error("cannot capture {point} snapshot")]
    ArtifactUnreadable {
        point: SnapshotPoint,
        #[source]
        source: SnapshotError,
    },
    #[error("{run}: generator execution failed")]
    GeneratorCrashed {
        run: GenerationRun,
        #[source]
        source: ExecutionError,
    },
    #[error("{0}")]
    NonIdempotent(Box<Divergence>),
}

impl VerifyError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Precondition(_) => FailureKind::Precondition,
            Self::ArtifactUnreadable { .. } => FailureKind::SetupReadFailure,
            Self::GeneratorCrashed { run, .. } => FailureKind::GeneratorCrashed(*run),
            Self::NonIdempotent(_) => FailureKind::NonIdempotent,
        }
    }
}

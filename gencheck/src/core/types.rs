//! Shared types describing a single harness run.

use std::fmt;
use std::path::PathBuf;

/// Which of the two generator invocations is being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationRun {
    First,
    Second,
}

impl GenerationRun {
    /// 1-indexed run number.
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::First => "first run",
            Self::Second => "second run",
        }
    }
}

impl fmt::Display for GenerationRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The point in the run at which a snapshot is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotPoint {
    Initial,
    AfterFirstRun,
    AfterSecondRun,
}

impl SnapshotPoint {
    /// Snapshot taken right after `run` completes.
    pub fn after(run: GenerationRun) -> Self {
        match run {
            GenerationRun::First => Self::AfterFirstRun,
            GenerationRun::Second => Self::AfterSecondRun,
        }
    }
}

impl fmt::Display for SnapshotPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initial => "initial",
            Self::AfterFirstRun => "after first run",
            Self::AfterSecondRun => "after second run",
        })
    }
}

/// Orchestrator states, in the only order they are ever visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Preflight,
    BaselineCapture,
    FirstRun,
    SecondRun,
    Verify,
}

impl Stage {
    pub fn for_run(run: GenerationRun) -> Self {
        match run {
            GenerationRun::First => Self::FirstRun,
            GenerationRun::Second => Self::SecondRun,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preflight => "preflight",
            Self::BaselineCapture => "baseline_capture",
            Self::FirstRun => "first_run",
            Self::SecondRun => "second_run",
            Self::Verify => "verify",
        })
    }
}

/// External generator command plus the directory it runs in.
///
/// Stateless: the same invocation is reused for both runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl GenerationInvocation {
    /// Space-joined command line, for log and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

//! Orchestration for a single idempotence check.
//!
//! The run walks five states in a fixed order and never goes back:
//! `Preflight -> BaselineCapture -> FirstRun -> SecondRun -> Verify`.
//! Any failure is terminal. The verdict depends only on whether the artifact
//! after the second run equals the artifact after the first run; the initial
//! snapshot and both diffs are diagnostics.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::cleanliness::CleanlinessResult;
use crate::core::diff;
use crate::core::outcome::{Divergence, IdempotenceReport};
use crate::core::snapshot::Snapshot;
use crate::core::types::{GenerationInvocation, GenerationRun, SnapshotPoint, Stage};
use crate::error::{PreconditionError, VerifyError};
use crate::io::artifact::ArtifactReader;
use crate::io::config::HarnessConfig;
use crate::io::git::{CleanlinessChecker, parse_status_entries};
use crate::io::process::ProcessRunner;

/// Verify that running the generator a second time leaves the artifact unchanged.
///
/// Checks repository cleanliness, captures the baseline, runs the generator
/// exactly twice (capturing after each run), then compares the two post-run
/// snapshots. Returns the full report on success; on divergence the error
/// carries the same report.
pub fn verify_idempotence<C, R, A>(
    config: &HarnessConfig,
    checker: &C,
    runner: &R,
    reader: &A,
) -> Result<IdempotenceReport, VerifyError>
where
    C: CleanlinessChecker,
    R: ProcessRunner,
    A: ArtifactReader,
{
    let artifact = config.artifact_full_path();

    info!(
        stage = %Stage::Preflight,
        workdir = %config.working_dir.display(),
        "checking repository cleanliness"
    );
    preflight(checker, &config.working_dir)?;

    info!(stage = %Stage::BaselineCapture, artifact = %artifact.display(), "capturing baseline");
    let initial = capture(reader, &artifact, SnapshotPoint::Initial)?;

    let invocation = config.invocation();
    let after_first = generate(runner, reader, &invocation, &artifact, GenerationRun::First)?;
    let after_second = generate(runner, reader, &invocation, &artifact, GenerationRun::Second)?;

    info!(stage = %Stage::Verify, "comparing snapshots");
    let first_diff = diff::render(&initial, &after_first);
    let second_diff = diff::render(&after_first, &after_second);
    info!("initial content of {}:\n{}", artifact.display(), initial);
    info!("diff after first run:\n{}", first_diff);
    info!("diff after second run:\n{}", second_diff);

    let report = IdempotenceReport {
        artifact,
        initial,
        after_first,
        after_second,
        first_diff,
        second_diff,
    };
    if !report.is_idempotent() {
        warn!(
            inserted = report.second_diff.inserted(),
            deleted = report.second_diff.deleted(),
            "second run changed the artifact"
        );
        return Err(VerifyError::NonIdempotent(Box::new(Divergence(report))));
    }

    info!(
        first_run_changed = report.first_run_changed(),
        "generator is idempotent"
    );
    Ok(report)
}

fn preflight<C: CleanlinessChecker>(checker: &C, workdir: &Path) -> Result<(), PreconditionError> {
    match checker.check_clean(workdir) {
        Ok(CleanlinessResult::Clean) => {
            debug!("repository is clean");
            Ok(())
        }
        Ok(CleanlinessResult::Dirty(status)) => {
            let entries = parse_status_entries(&status);
            warn!(dirty_count = entries.len(), "repository has uncommitted changes");
            for entry in &entries {
                warn!(code = %entry.code, path = %entry.path, "uncommitted change");
            }
            Err(PreconditionError::Dirty { status })
        }
        Err(source) => Err(PreconditionError::Check {
            workdir: workdir.to_path_buf(),
            source,
        }),
    }
}

fn capture<A: ArtifactReader>(
    reader: &A,
    artifact: &Path,
    point: SnapshotPoint,
) -> Result<Snapshot, VerifyError> {
    let snapshot = reader
        .read_snapshot(artifact)
        .map_err(|source| VerifyError::ArtifactUnreadable { point, source })?;
    debug!(%point, bytes = snapshot.len(), lines = snapshot.line_count(), "captured snapshot");
    if snapshot.is_empty() {
        warn!(%point, artifact = %artifact.display(), "artifact is empty");
    }
    Ok(snapshot)
}

fn generate<R: ProcessRunner, A: ArtifactReader>(
    runner: &R,
    reader: &A,
    invocation: &GenerationInvocation,
    artifact: &Path,
    run: GenerationRun,
) -> Result<Snapshot, VerifyError> {
    info!(stage = %Stage::for_run(run), command = %invocation.command_line(), "invoking generator");
    runner
        .run(invocation, run)
        .map_err(|source| VerifyError::GeneratorCrashed { run, source })?;
    capture(reader, artifact, SnapshotPoint::after(run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::FailureKind;
    use crate::error::CheckError;
    use crate::io::config::FileConfig;
    use crate::test_support::{Call, FakeWorkspace, RunScript};
    use std::path::PathBuf;

    fn config() -> HarnessConfig {
        HarnessConfig::new(PathBuf::from("/repo"), FileConfig::default()).expect("config")
    }

    fn verify(ws: &FakeWorkspace) -> Result<IdempotenceReport, VerifyError> {
        verify_idempotence(&config(), ws, ws, ws)
    }

    #[test]
    fn calls_happen_in_fixed_order() {
        let ws = FakeWorkspace::new(Some("x=1\n"));
        verify(&ws).expect("pass");

        let cfg = config();
        let artifact = cfg.artifact_full_path();
        let invocation = cfg.invocation();
        assert_eq!(
            ws.calls(),
            vec![
                Call::CheckClean(PathBuf::from("/repo")),
                Call::Read(artifact.clone()),
                Call::Run {
                    run: GenerationRun::First,
                    invocation: invocation.clone(),
                },
                Call::Read(artifact.clone()),
                Call::Run {
                    run: GenerationRun::Second,
                    invocation,
                },
                Call::Read(artifact),
            ]
        );
    }

    #[test]
    fn check_error_is_a_precondition_failure() {
        let ws = FakeWorkspace::new(Some("x=1\n")).with_cleanliness(Err(
            CheckError::NotAVersionedRepo("fatal: not a git repository".to_string()),
        ));
        let err = verify(&ws).expect_err("not a repo");
        assert_eq!(err.kind(), FailureKind::Precondition);
        assert!(matches!(
            err,
            VerifyError::Precondition(PreconditionError::Check {
                source: CheckError::NotAVersionedRepo(_),
                ..
            })
        ));
        assert_eq!(ws.calls().len(), 1);
    }

    #[test]
    fn missing_baseline_stops_before_generator() {
        let ws = FakeWorkspace::new(None);
        let err = verify(&ws).expect_err("missing artifact");
        assert!(matches!(
            err,
            VerifyError::ArtifactUnreadable {
                point: SnapshotPoint::Initial,
                ..
            }
        ));
        assert_eq!(ws.run_count(), 0);
    }

    #[test]
    fn first_run_crash_skips_second_run() {
        let ws = FakeWorkspace::new(Some("x=1\n")).with_runs([RunScript::Crash(1)]);
        let err = verify(&ws).expect_err("crash");
        assert_eq!(err.kind(), FailureKind::GeneratorCrashed(GenerationRun::First));
        assert_eq!(ws.run_count(), 1);
    }

    #[test]
    fn second_run_crash_is_reported_as_run_two() {
        let ws = FakeWorkspace::new(Some("x=1\n"))
            .with_runs([RunScript::Leave, RunScript::Crash(2)]);
        let err = verify(&ws).expect_err("crash");
        assert_eq!(err.kind(), FailureKind::GeneratorCrashed(GenerationRun::Second));
        assert_eq!(ws.run_count(), 2);
    }

    #[test]
    fn artifact_deleted_by_generator_is_unreadable_after_run() {
        let ws = FakeWorkspace::new(Some("x=1\n")).with_runs([RunScript::Delete]);
        let err = verify(&ws).expect_err("deleted");
        assert!(matches!(
            err,
            VerifyError::ArtifactUnreadable {
                point: SnapshotPoint::AfterFirstRun,
                ..
            }
        ));
        assert_eq!(err.kind(), FailureKind::SetupReadFailure);
    }

    #[test]
    fn first_run_rewrite_is_allowed() {
        let ws = FakeWorkspace::new(Some("b\na\n"))
            .with_runs([RunScript::write("a\nb\n"), RunScript::write("a\nb\n")]);
        let report = verify(&ws).expect("pass");
        assert!(report.first_run_changed());
        assert!(!report.first_diff.is_empty());
        assert!(report.second_diff.is_empty());
    }

    #[test]
    fn trailing_newline_churn_is_not_idempotent() {
        let ws = FakeWorkspace::new(Some("x=1\n"))
            .with_runs([RunScript::write("x=1\n"), RunScript::write("x=1")]);
        let err = verify(&ws).expect_err("diverged");
        assert_eq!(err.kind(), FailureKind::NonIdempotent);
    }

    #[test]
    fn empty_baseline_is_a_valid_snapshot() {
        let ws = FakeWorkspace::new(Some(""))
            .with_runs([RunScript::write("x=1\n"), RunScript::write("x=1\n")]);
        let report = verify(&ws).expect("pass");
        assert!(report.initial.is_empty());
        assert!(!report.after_first.is_empty());
        assert!(report.first_run_changed());
    }
}

//! Stable exit codes for the `gencheck` CLI.

use crate::core::outcome::FailureKind;

/// The generator is idempotent (or the repository is clean for `check-clean`).
pub const OK: i32 = 0;
/// The second generator run changed the artifact.
pub const NON_IDEMPOTENT: i32 = 1;
/// The repository is dirty or could not be queried.
pub const PRECONDITION: i32 = 2;
/// Invalid configuration, or the artifact could not be read.
pub const SETUP: i32 = 3;
/// The generator failed to start or exited non-zero.
pub const GENERATOR: i32 = 4;

/// Map a terminal failure to its process exit code.
pub fn for_failure(kind: FailureKind) -> i32 {
    match kind {
        FailureKind::Configuration | FailureKind::SetupReadFailure => SETUP,
        FailureKind::Precondition => PRECONDITION,
        FailureKind::GeneratorCrashed(_) => GENERATOR,
        FailureKind::NonIdempotent => NON_IDEMPOTENT,
    }
}

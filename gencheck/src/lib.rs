//! Idempotence verifier for code and config generators.
//!
//! The harness checks that a generator reaches a fixed point. It requires a clean
//! repository, captures the generated artifact, runs the generator twice and
//! asserts that the second run left the artifact byte-identical to the first.
//! The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (snapshots, status classification,
//!   diff rendering, outcome types). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (process execution, git, file reads,
//!   configuration). Each sits behind a trait so tests can script it.
//!
//! [`verify`] ties the two together into a single ordered pass.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;

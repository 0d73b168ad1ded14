//! Deterministic, pure logic shared by the harness.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod cleanliness;
pub mod diff;
pub mod outcome;
pub mod snapshot;
pub mod types;

//! Side-effecting adapters used by the orchestrator.

pub mod artifact;
pub mod config;
pub mod git;
pub mod process;

//! `gencheck`: verify that a generator reaches a fixed point on its artifact.
//!
//! Reads the repository root from `SOURCE_REPO_PATH`, runs the configured
//! generator twice, and fails if the second run rewrites the artifact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gencheck::core::cleanliness::CleanlinessResult;
use gencheck::core::outcome::FailureKind;
use gencheck::error::{PreconditionError, VerifyError};
use gencheck::exit_codes;
use gencheck::io::artifact::FsArtifactReader;
use gencheck::io::config::{FileConfig, HarnessConfig, load_file_config};
use gencheck::io::git::{CleanlinessChecker, GitCleanlinessChecker};
use gencheck::io::process::SystemProcessRunner;
use gencheck::logging;
use gencheck::verify::verify_idempotence;

#[derive(Parser)]
#[command(
    name = "gencheck",
    version,
    about = "Verify that a code/config generator is idempotent on its output"
)]
struct Cli {
    /// TOML file overriding the artifact path and generator command.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the generator twice and compare the artifact (default).
    Verify,
    /// Only check that the repository has no uncommitted changes.
    CheckClean,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::for_failure(failure_kind(&err))
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_harness_config(cli.config.as_deref())?;
    match cli.command.as_ref().unwrap_or(&Command::Verify) {
        Command::Verify => cmd_verify(&config),
        Command::CheckClean => cmd_check_clean(&config),
    }
}

/// `SOURCE_REPO_PATH` is resolved before `--config` is read, so a missing
/// variable is reported even when the file is also bad.
fn load_harness_config(path: Option<&Path>) -> Result<HarnessConfig> {
    let working_dir = HarnessConfig::working_dir_from_env()?;
    let file = match path {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };
    Ok(HarnessConfig::new(working_dir, file)?)
}

fn cmd_verify(config: &HarnessConfig) -> Result<()> {
    let report = verify_idempotence(
        config,
        &GitCleanlinessChecker,
        &SystemProcessRunner::inherit(),
        &FsArtifactReader,
    )
    .with_context(|| format!("idempotence check of {}", config.artifact_full_path().display()))?;
    println!("ok: {} is stable under repeated generation", report.artifact.display());
    Ok(())
}

fn cmd_check_clean(config: &HarnessConfig) -> Result<()> {
    let result = GitCleanlinessChecker
        .check_clean(&config.working_dir)
        .map_err(|source| {
            VerifyError::from(PreconditionError::Check {
                workdir: config.working_dir.clone(),
                source,
            })
        })?;
    match result {
        CleanlinessResult::Clean => {
            println!("clean");
            Ok(())
        }
        CleanlinessResult::Dirty(status) => {
            Err(VerifyError::from(PreconditionError::Dirty { status }).into())
        }
    }
}

/// Recover the terminal failure kind from an error chain.
///
/// Anything that is not a [`VerifyError`] was raised while building the config.
fn failure_kind(err: &anyhow::Error) -> FailureKind {
    err.downcast_ref::<VerifyError>()
        .map_or(FailureKind::Configuration, VerifyError::kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gencheck::error::ConfigError;

    #[test]
    fn no_subcommand_defaults_to_verify() {
        let cli = Cli::parse_from(["gencheck"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_check_clean_with_config() {
        let cli = Cli::parse_from(["gencheck", "check-clean", "--config", "gencheck.toml"]);
        assert_eq!(cli.command, Some(Command::CheckClean));
        assert_eq!(cli.config, Some(PathBuf::from("gencheck.toml")));
    }

    #[test]
    fn failure_kind_sees_through_context() {
        let err = anyhow::Error::new(VerifyError::from(PreconditionError::Dirty {
            status: "?? x\n".to_string(),
        }))
        .context("idempotence check");
        assert_eq!(failure_kind(&err), FailureKind::Precondition);
    }

    #[test]
    fn config_errors_map_to_configuration() {
        let err = anyhow::Error::new(ConfigError::EmptyCommand);
        assert_eq!(failure_kind(&err), FailureKind::Configuration);
    }
}

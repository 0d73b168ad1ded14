//! Harness configuration.
//!
//! The repository root comes from the `SOURCE_REPO_PATH` environment variable;
//! the artifact path and generator command default to the Gazelle setup and
//! can be overridden by an optional TOML file. The resulting [`HarnessConfig`]
//! is built once by the entry point and passed by reference into the core.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::types::GenerationInvocation;
use crate::error::ConfigError;

/// Environment variable naming the absolute repository root.
pub const SOURCE_REPO_ENV: &str = "SOURCE_REPO_PATH";
/// Artifact checked when no config file overrides it.
pub const DEFAULT_ARTIFACT_PATH: &str = "proto/example/BUILD.bazel";
/// Generator command used when no config file overrides it.
pub const DEFAULT_GENERATOR_COMMAND: [&str; 3] = ["bazel", "run", "//:gazelle"];

/// Overrides read from a TOML config file.
///
/// Missing fields fall back to the Gazelle defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Artifact path relative to the repository root.
    pub artifact_path: PathBuf,

    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Program followed by its arguments (e.g. `["bazel","run","//:gazelle"]`).
    pub command: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_GENERATOR_COMMAND
                .iter()
                .map(|part| part.to_string())
                .collect(),
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            generator: GeneratorConfig::default(),
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.artifact_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyArtifact);
        }
        if self.artifact_path.is_absolute() {
            return Err(ConfigError::AbsoluteArtifact {
                path: self.artifact_path.clone(),
            });
        }
        match self.generator.command.first() {
            Some(program) if !program.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::EmptyCommand),
        }
    }
}

/// Load overrides from an explicitly named TOML file.
///
/// Unlike an implicit default location, a named file must exist.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: FileConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate()?;
    Ok(cfg)
}

/// Fully resolved configuration for one harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Absolute repository root; every relative path resolves against it.
    pub working_dir: PathBuf,
    /// Artifact path relative to `working_dir`.
    pub artifact_path: PathBuf,
    /// Generator program followed by its arguments.
    pub generator_command: Vec<String>,
}

impl HarnessConfig {
    /// Build from `SOURCE_REPO_PATH` plus file overrides.
    pub fn from_env(file: FileConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var_os(key), file)
    }

    /// Build using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F, file: FileConfig) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Option<OsString>,
    {
        Self::new(Self::working_dir_from_lookup(lookup)?, file)
    }

    /// The absolute repository root named by `SOURCE_REPO_PATH`.
    pub fn working_dir_from_env() -> Result<PathBuf, ConfigError> {
        Self::working_dir_from_lookup(|key| env::var_os(key))
    }

    pub fn working_dir_from_lookup<F>(lookup: F) -> Result<PathBuf, ConfigError>
    where
        F: FnOnce(&str) -> Option<OsString>,
    {
        let raw = lookup(SOURCE_REPO_ENV).ok_or(ConfigError::MissingEnv {
            var: SOURCE_REPO_ENV,
        })?;
        require_absolute(PathBuf::from(raw))
    }

    pub fn new(working_dir: PathBuf, file: FileConfig) -> Result<Self, ConfigError> {
        let working_dir = require_absolute(working_dir)?;
        file.validate()?;
        Ok(Self {
            working_dir,
            artifact_path: file.artifact_path,
            generator_command: file.generator.command,
        })
    }

    /// Artifact path joined onto the repository root.
    pub fn artifact_full_path(&self) -> PathBuf {
        self.working_dir.join(&self.artifact_path)
    }

    /// The generator invocation reused for both runs.
    pub fn invocation(&self) -> GenerationInvocation {
        let (program, args) = match self.generator_command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (String::new(), Vec::new()),
        };
        GenerationInvocation {
            program,
            args,
            workdir: self.working_dir.clone(),
        }
    }
}

fn require_absolute(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ConfigError::RelativeWorkingDir {
            var: SOURCE_REPO_ENV,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_root() -> PathBuf {
        std::env::temp_dir().join("gencheck-repo")
    }

    #[test]
    fn missing_env_is_a_configuration_error() {
        let err =
            HarnessConfig::from_lookup(|_| None, FileConfig::default()).expect_err("missing");
        assert!(matches!(err, ConfigError::MissingEnv { var } if var == SOURCE_REPO_ENV));
        assert!(err.to_string().contains("SOURCE_REPO_PATH"));
    }

    #[test]
    fn lookup_asks_for_source_repo_path() {
        let root = repo_root();
        let cfg = HarnessConfig::from_lookup(
            |key| {
                assert_eq!(key, SOURCE_REPO_ENV);
                Some(root.clone().into_os_string())
            },
            FileConfig::default(),
        )
        .expect("config");
        assert_eq!(cfg.working_dir, root);
    }

    #[test]
    fn relative_working_dir_is_rejected() {
        let err = HarnessConfig::working_dir_from_lookup(|_| Some("relative/repo".into()))
            .expect_err("relative");
        assert!(matches!(err, ConfigError::RelativeWorkingDir { .. }));
        let err = HarnessConfig::new(PathBuf::from("relative/repo"), FileConfig::default())
            .expect_err("relative");
        assert!(matches!(err, ConfigError::RelativeWorkingDir { .. }));
    }

    #[test]
    fn working_dir_resolves_without_touching_file_config() {
        let root = repo_root();
        let dir = HarnessConfig::working_dir_from_lookup(|_| Some(root.clone().into_os_string()))
            .expect("working dir");
        assert_eq!(dir, root);
        let err = HarnessConfig::working_dir_from_lookup(|_| None).expect_err("missing");
        assert!(matches!(err, ConfigError::MissingEnv { .. }));
    }

    #[test]
    fn defaults_target_gazelle_build_file() {
        let cfg = HarnessConfig::new(repo_root(), FileConfig::default()).expect("config");
        assert_eq!(
            cfg.artifact_full_path(),
            repo_root().join("proto").join("example").join("BUILD.bazel")
        );
        let invocation = cfg.invocation();
        assert_eq!(invocation.program, "bazel");
        assert_eq!(invocation.args, vec!["run", "//:gazelle"]);
        assert_eq!(invocation.workdir, repo_root());
    }

    #[test]
    fn file_overrides_artifact_and_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("gencheck.toml");
        fs::write(
            &path,
            "artifact_path = \"gen/schema.json\"\n\n\
             [generator]\ncommand = [\"make\", \"schema\"]\n",
        )
        .expect("write");
        let file = load_file_config(&path).expect("load");
        let cfg = HarnessConfig::new(repo_root(), file).expect("config");
        assert_eq!(cfg.artifact_full_path(), repo_root().join("gen/schema.json"));
        assert_eq!(cfg.invocation().command_line(), "make schema");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("gencheck.toml");
        fs::write(&path, "artifact_path = \"BUILD\"\n").expect("write");
        let file = load_file_config(&path).expect("load");
        assert_eq!(file.generator, GeneratorConfig::default());
        assert_eq!(file.artifact_path, PathBuf::from("BUILD"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("gencheck.toml");
        fs::write(&path, "[generator]\ncommand = []\n").expect("write");
        let err = load_file_config(&path).expect_err("empty");
        assert!(matches!(err, ConfigError::EmptyCommand));
    }

    #[test]
    fn absolute_artifact_is_rejected() {
        let file = FileConfig {
            artifact_path: repo_root().join("BUILD.bazel"),
            ..FileConfig::default()
        };
        let err = HarnessConfig::new(repo_root(), file).expect_err("absolute");
        assert!(matches!(err, ConfigError::AbsoluteArtifact { .. }));
    }

    #[test]
    fn missing_named_file_is_a_read_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_file_config(&temp.path().join("missing.toml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("gencheck.toml");
        fs::write(&path, "artefact = \"typo\"\n").expect("write");
        let err = load_file_config(&path).expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}

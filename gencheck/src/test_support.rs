//! Test-only collaborators: scripted workspace, scratch git repos, and
//! in-memory output sinks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result, bail};

use crate::core::cleanliness::CleanlinessResult;
use crate::core::snapshot::Snapshot;
use crate::core::types::{GenerationInvocation, GenerationRun};
use crate::error::{CheckError, ExecutionError, SnapshotError};
use crate::io::artifact::ArtifactReader;
use crate::io::git::CleanlinessChecker;
use crate::io::process::ProcessRunner;

/// One collaborator call observed by [`FakeWorkspace`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CheckClean(PathBuf),
    Read(PathBuf),
    Run {
        run: GenerationRun,
        invocation: GenerationInvocation,
    },
}

/// What a scripted generator run does to the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScript {
    /// Overwrite the artifact with this content.
    Write(String),
    /// Exit successfully without touching the artifact.
    Leave,
    /// Delete the artifact, then exit successfully.
    Delete,
    /// Exit with this code without touching the artifact.
    Crash(i32),
}

impl RunScript {
    pub fn write(content: &str) -> Self {
        Self::Write(content.to_string())
    }
}

/// In-memory checker, generator and artifact sharing one call log.
///
/// Runs beyond the scripted ones behave like [`RunScript::Leave`].
#[derive(Debug)]
pub struct FakeWorkspace {
    cleanliness: Result<CleanlinessResult, CheckError>,
    artifact: RefCell<Option<String>>,
    scripts: RefCell<VecDeque<RunScript>>,
    calls: RefCell<Vec<Call>>,
}

impl FakeWorkspace {
    /// Clean repository whose artifact starts with `initial` (absent if `None`).
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            cleanliness: Ok(CleanlinessResult::Clean),
            artifact: RefCell::new(initial.map(str::to_string)),
            scripts: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_cleanliness(mut self, result: Result<CleanlinessResult, CheckError>) -> Self {
        self.cleanliness = result;
        self
    }

    pub fn with_runs(self, scripts: impl IntoIterator<Item = RunScript>) -> Self {
        self.scripts.borrow_mut().extend(scripts);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Number of generator invocations recorded so far.
    pub fn run_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Run { .. }))
            .count()
    }

    pub fn artifact(&self) -> Option<String> {
        self.artifact.borrow().clone()
    }
}

impl CleanlinessChecker for FakeWorkspace {
    fn check_clean(&self, workdir: &Path) -> Result<CleanlinessResult, CheckError> {
        self.calls
            .borrow_mut()
            .push(Call::CheckClean(workdir.to_path_buf()));
        self.cleanliness.clone()
    }
}

impl ProcessRunner for FakeWorkspace {
    fn run(
        &self,
        invocation: &GenerationInvocation,
        run: GenerationRun,
    ) -> Result<(), ExecutionError> {
        self.calls.borrow_mut().push(Call::Run {
            run,
            invocation: invocation.clone(),
        });
        let script = self
            .scripts
            .borrow_mut()
            .pop_front()
            .unwrap_or(RunScript::Leave);
        match script {
            RunScript::Write(content) => *self.artifact.borrow_mut() = Some(content),
            RunScript::Leave => {}
            RunScript::Delete => *self.artifact.borrow_mut() = None,
            RunScript::Crash(code) => {
                return Err(ExecutionError::NonZeroExit {
                    program: invocation.program.clone(),
                    code: Some(code),
                });
            }
        }
        Ok(())
    }
}

impl ArtifactReader for FakeWorkspace {
    fn read_snapshot(&self, path: &Path) -> Result<Snapshot, SnapshotError> {
        self.calls.borrow_mut().push(Call::Read(path.to_path_buf()));
        match self.artifact.borrow().as_deref() {
            Some(content) => Ok(Snapshot::from(content)),
            None => Err(SnapshotError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Cloneable in-memory writer for capturing forwarded output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Captured bytes as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Scratch git repository in a temp directory.
#[derive(Debug)]
pub struct TestRepo {
    dir: tempfile::TempDir,
}

impl TestRepo {
    /// Empty repository with a local identity configured.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo dir")?;
        let repo = Self { dir };
        repo.git(&["init", "--quiet"])?;
        repo.git(&["config", "user.email", "gencheck@example.com"])?;
        repo.git(&["config", "user.name", "gencheck"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    /// Repository with `rel` committed at `contents`.
    pub fn with_artifact(rel: &str, contents: &str) -> Result<Self> {
        let repo = Self::new()?;
        repo.write(rel, contents)?;
        repo.commit_all("add artifact")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.path().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "--quiet", "-m", message])
    }

    pub fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(())
    }
}

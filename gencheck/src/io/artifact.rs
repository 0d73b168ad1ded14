//! Snapshot reads of the generated artifact.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::core::snapshot::Snapshot;
use crate::error::SnapshotError;

/// Source of artifact snapshots.
pub trait ArtifactReader {
    fn read_snapshot(&self, path: &Path) -> Result<Snapshot, SnapshotError>;
}

/// Reader backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactReader;

impl ArtifactReader for FsArtifactReader {
    fn read_snapshot(&self, path: &Path) -> Result<Snapshot, SnapshotError> {
        read_snapshot(path)
    }
}

/// Read the whole file as UTF-8 text.
///
/// Artifacts are small build/config files, so there is no streaming or partial
/// read: the content is either captured completely or not at all.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    match fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), bytes = content.len(), "read artifact snapshot");
            Ok(Snapshot::from(content))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SnapshotError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(SnapshotError::ReadFailure {
            path: path.to_path_buf(),
            source,
        }),
    }
}

//! Immutable text capture of the artifact.

use std::fmt;

/// Full text content of the artifact at one point in the run.
///
/// Snapshots compare by content: two captures are equal exactly when their
/// bytes are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }
}

impl From<String> for Snapshot {
    fn from(content: String) -> Self {
        Self(content)
    }
}

impl From<&str> for Snapshot {
    fn from(content: &str) -> Self {
        Self(content.to_string())
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

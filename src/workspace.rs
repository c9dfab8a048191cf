//! Per-build scratch directories.

use std::path::Path;

use tempfile::TempDir;

use crate::errors::BuildError;

/// An exclusively-owned scratch directory for one build request.
///
/// The directory and everything inside it are removed when the value is
/// dropped, so release happens on every exit path (success, compile failure,
/// or panic unwind) without per-branch cleanup calls.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Allocate a fresh, uniquely named directory under the system temp root.
    pub fn acquire() -> Result<Self, BuildError> {
        let dir = tempfile::Builder::new()
            .prefix("smelter-build-")
            .tempdir()
            .map_err(BuildError::WorkspaceAllocate)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

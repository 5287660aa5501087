//! File-system helpers
//!
//! All artifact writes go through `atomic_write` (temp file + rename in the
//! destination directory), so a crashed or failed task never leaves a
//! half-written document that is indistinguishable from success.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::{TopolayError, TopolayResult};

/// Write content to a file atomically, creating parent directories.
pub fn atomic_write(path: &Path, content: &str) -> TopolayResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| TopolayError::Io(e.error))?;
    Ok(())
}

/// Task-scoped paths derived from the transformation process id.
///
/// Two concurrent tasks always get distinct working files, so pipeline
/// instances never contend on the same output path.
#[derive(Debug, Clone)]
pub struct TaskPaths {
    root: PathBuf,
    process_id: Uuid,
}

impl TaskPaths {
    pub fn new(root: impl Into<PathBuf>, process_id: Uuid) -> Self {
        Self {
            root: root.into(),
            process_id,
        }
    }

    /// Where the graph description for this task is written
    pub fn dot_file(&self) -> PathBuf {
        self.root
            .join("graphviz")
            .join(format!("{}.dot", self.process_id))
    }

    /// Resolve a document path (relative to the task output root)
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

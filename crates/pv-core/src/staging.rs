//! Temporary on-disk staging of mod file payloads
//!
//! Payloads are written out during intake and read back at assembly time.
//! The staging directory lives as long as the [`StagingArea`]; dropping it
//! removes everything, on success and error paths alike.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Handle to one staged payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Where the payload lives on disk
    pub path: PathBuf,
    /// Payload size in bytes
    pub size: u64,
}

impl StagedFile {
    /// Read the payload back
    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| Error::FileRead {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Owned temporary directory holding staged payloads
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    next_id: usize,
}

impl StagingArea {
    /// Create a staging area in the system temp directory
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pv-merge-").tempdir()?;
        debug!(path = %dir.path().display(), "created staging area");
        Ok(Self { dir, next_id: 0 })
    }

    /// Create a staging area under a specific directory
    pub fn new_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pv-merge-")
            .tempdir_in(parent)?;
        Ok(Self { dir, next_id: 0 })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a payload and return its handle
    ///
    /// Every call gets its own file, so two members with the same base name
    /// never overwrite each other.
    pub fn stage(&mut self, source: &str, member_path: &str, bytes: &[u8]) -> Result<StagedFile> {
        let file_name = member_path.rsplit('/').next().unwrap_or(member_path);
        let staged_name = format!(
            "{:05}_{}_{}",
            self.next_id,
            sanitize(source),
            sanitize(file_name)
        );
        self.next_id += 1;

        let path = self.dir.path().join(staged_name);
        fs::write(&path, bytes)?;
        debug!(source, member = member_path, staged = %path.display(), "staged file");

        Ok(StagedFile {
            path,
            size: bytes.len() as u64,
        })
    }

    /// Remove the staging directory now, reporting any failure
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Keep a name safe to use as a single path component
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

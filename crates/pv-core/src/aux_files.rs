//! Registry of auxiliary (non-parameter) files contributed by mods

use crate::conflict::{self, Candidate, CandidateValue, ConflictKind, ConflictMap, Decider, Resolved};
use crate::error::Result;
use crate::staging::StagedFile;
use std::collections::BTreeMap;

impl CandidateValue for StagedFile {
    fn preview(&self) -> Option<&str> {
        None
    }
}

/// Normalize an archive member path to the output form
///
/// Backslashes become forward slashes and leading separators are dropped.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Accumulates every (source, staged file) seen per destination path
///
/// Owned by a single run and filled during intake. Contributions are told
/// apart by source only: two mods shipping byte-identical files for the
/// same path still count as a conflict.
#[derive(Debug, Clone, Default)]
pub struct AuxFileRegistry {
    entries: ConflictMap<StagedFile>,
}

impl AuxFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contribution; a repeat from the same source replaces it
    pub fn record(&mut self, path: &str, source: &str, staged: StagedFile) {
        let candidates = self.entries.entry(normalize_path(path)).or_default();
        match candidates.iter_mut().find(|c| c.source == source) {
            Some(existing) => existing.value = staged,
            None => candidates.push(Candidate::new(source, staged)),
        }
    }

    /// Number of distinct destination paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Contributions for one path, in the order they were recorded
    pub fn candidates(&self, path: &str) -> Option<&[Candidate<StagedFile>]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Paths contributed by more than one source
    pub fn conflicting_paths(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, c)| c.len() > 1)
            .map(|(p, _)| p.as_str())
    }

    /// Every path with its contributions, ascending by path
    pub fn entries(&self) -> &ConflictMap<StagedFile> {
        &self.entries
    }

    /// Pick one staged file per path
    pub fn resolve<D: Decider + ?Sized>(
        &self,
        decider: &mut D,
    ) -> Result<BTreeMap<String, Resolved<StagedFile>>> {
        conflict::resolve(ConflictKind::File, &self.entries, decider)
    }
}

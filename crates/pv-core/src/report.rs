//! Merge report: a record of what a run decided and wrote

use crate::archive::AssembleReport;
use crate::conflict::Resolved;
use crate::error::{Error, Result};
use crate::intake::SkippedMod;
use crate::merger::MergeStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The winner picked for one parameter key or file path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub subject: String,
    pub source: String,
    /// Number of competing candidates; 1 means auto-applied
    pub candidates: usize,
}

impl Decision {
    pub fn was_conflict(&self) -> bool {
        self.candidates > 1
    }
}

/// Build decisions from resolved entries, ascending by subject
pub fn decisions<T>(resolved: &BTreeMap<String, Resolved<T>>) -> Vec<Decision> {
    resolved
        .iter()
        .map(|(subject, r)| Decision {
            subject: subject.clone(),
            source: r.source.clone(),
            candidates: r.candidates,
        })
        .collect()
}

/// Everything a successful run did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    /// When the archive was written
    pub timestamp: DateTime<Utc>,
    /// Parameter decisions
    pub params: Vec<Decision>,
    /// Auxiliary file decisions
    pub files: Vec<Decision>,
    /// What the merge did to the parameter file
    pub stats: MergeStats,
    /// What was written to the archive
    pub archive: AssembleReport,
    /// Mods that could not be read
    pub skipped: Vec<SkippedMod>,
}

impl MergeReport {
    pub fn new(
        params: Vec<Decision>,
        files: Vec<Decision>,
        stats: MergeStats,
        archive: AssembleReport,
        skipped: Vec<SkippedMod>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            params,
            files,
            stats,
            archive,
            skipped,
        }
    }

    /// Number of decisions that needed a choice
    pub fn conflicts(&self) -> usize {
        self.params
            .iter()
            .chain(&self.files)
            .filter(|d| d.was_conflict())
            .count()
    }

    /// Load a report from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the report as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

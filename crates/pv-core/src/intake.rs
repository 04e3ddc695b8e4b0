//! Mod discovery and extraction
//!
//! Walks the mods folder, opens each supported package and splits its
//! contents into the mod's parameter file and auxiliary files. Auxiliary
//! payloads are staged on disk and recorded in the caller's registry.

use crate::archive::{is_archive_name, read_archive, read_zip_bytes, ArchiveEntry, ArchiveKind};
use crate::aux_files::AuxFileRegistry;
use crate::error::{Error, Result};
use crate::params::{ModParams, ParamSet};
use crate::staging::{StagedFile, StagingArea};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A mod that could not be read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedMod {
    pub source: String,
    pub reason: String,
}

/// What intake found across all mods
#[derive(Debug, Clone, Default)]
pub struct Intake {
    /// Parameter files, in mod order
    pub param_sources: Vec<ModParams>,
    /// Entries in the mods folder that were looked at
    pub mods_seen: usize,
    /// Entries that were not a supported mod format
    pub ignored: Vec<String>,
    /// Mods that failed to open or read
    pub skipped: Vec<SkippedMod>,
}

impl Intake {
    /// True when no mod supplied a parameter file
    ///
    /// Auxiliary files alone do not make a usable mod set.
    pub fn found_nothing(&self) -> bool {
        self.param_sources.is_empty()
    }
}

/// Contents of one mod, held until the whole mod has been read
#[derive(Default)]
struct ModContents {
    params: Option<ParamSet>,
    files: Vec<(String, StagedFile)>,
}

/// How intake recognises the parameter file
#[derive(Debug, Clone)]
pub struct ParamFileMatcher {
    /// Lower-cased file name, e.g. `player_variables.scr`
    file_name: String,
    /// Lower-cased stem, e.g. `player_variables`
    stem: String,
    /// Lower-cased extension with dot, e.g. `.scr`
    extension: String,
}

impl ParamFileMatcher {
    pub fn new(file_name: &str) -> Self {
        let file_name = file_name.to_ascii_lowercase();
        let path = Path::new(&file_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&file_name)
            .to_string();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        Self {
            file_name,
            stem,
            extension,
        }
    }

    /// Archive member that is the parameter file
    pub fn is_member(&self, member_path: &str) -> bool {
        member_path.to_ascii_lowercase().ends_with(&self.file_name)
    }

    /// Loose file in the mods folder that is a raw parameter document
    pub fn is_loose_document(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        !self.extension.is_empty() && lower.ends_with(&self.extension) && lower.contains(&self.stem)
    }
}

/// Read every mod in `mods_dir`, in file-name order
///
/// A missing or empty folder is not an error; the returned intake is just
/// empty. Symlinked mods are followed. A mod that fails to list or read is
/// logged, recorded in [`Intake::skipped`] and contributes nothing.
pub fn collect_mods<P: AsRef<Path>>(
    mods_dir: P,
    matcher: &ParamFileMatcher,
    staging: &mut StagingArea,
    registry: &mut AuxFileRegistry,
) -> Result<Intake> {
    let mods_dir = mods_dir.as_ref();
    let mut intake = Intake::default();

    if !mods_dir.is_dir() {
        info!(path = %mods_dir.display(), "mods folder does not exist");
        return Ok(intake);
    }

    for entry in WalkDir::new(mods_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let source = e
                    .path()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| mods_dir.display().to_string());
                warn!(source = source.as_str(), error = %e, "failed to list mod, skipping");
                intake.skipped.push(SkippedMod {
                    source,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let source = entry.file_name().to_string_lossy().into_owned();
        intake.mods_seen += 1;
        info!(source = source.as_str(), "processing mod");

        let contents = match read_mod(path, &source, matcher, staging) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                info!(
                    source = source.as_str(),
                    "skipped: only .zip, .7z, .pak and parameter files are supported"
                );
                intake.ignored.push(source);
                continue;
            }
            Err(e) => {
                warn!(source = source.as_str(), error = %e, "failed to read mod, skipping");
                intake.skipped.push(SkippedMod {
                    source,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for (member, staged) in contents.files {
            registry.record(&member, &source, staged);
        }
        if let Some(params) = contents.params {
            intake.param_sources.push(ModParams::new(source, params));
        }
    }

    Ok(intake)
}

/// Read one mod; `None` means the file is not a format we handle
fn read_mod(
    path: &Path,
    source: &str,
    matcher: &ParamFileMatcher,
    staging: &mut StagingArea,
) -> Result<Option<ModContents>> {
    if ArchiveKind::from_path(path).is_some() {
        return read_mod_archive(path, source, matcher, staging).map(Some);
    }

    if matcher.is_loose_document(source) {
        let bytes = fs::read(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(source, "found loose parameter file");
        return Ok(Some(ModContents {
            params: Some(ParamSet::from_text(&String::from_utf8_lossy(&bytes))),
            files: Vec::new(),
        }));
    }

    Ok(None)
}

/// Read a packaged mod, looking inside the first nested pak first
fn read_mod_archive(
    path: &Path,
    source: &str,
    matcher: &ParamFileMatcher,
    staging: &mut StagingArea,
) -> Result<ModContents> {
    let entries = read_archive(path)?;
    let mut contents = ModContents::default();

    let nested = entries
        .iter()
        .find(|e| !e.is_dir && e.path.to_ascii_lowercase().ends_with(".pak"));

    if let Some(pak) = nested {
        info!(source, pak = pak.path.as_str(), "looking inside nested pak");
        let inner = read_zip_bytes(&pak.data, &path.join(&pak.path))?;
        scan_members(&inner, source, matcher, staging, &mut contents)?;
    }

    if contents.params.is_none() {
        if nested.is_some() {
            info!(source, "no parameter file in nested pak, searching the archive root");
        }
        scan_members(&entries, source, matcher, staging, &mut contents)?;
    }

    Ok(contents)
}

fn scan_members(
    entries: &[ArchiveEntry],
    source: &str,
    matcher: &ParamFileMatcher,
    staging: &mut StagingArea,
    contents: &mut ModContents,
) -> Result<()> {
    for entry in entries.iter().filter(|e| !e.is_dir) {
        if matcher.is_member(&entry.path) {
            info!(source, member = entry.path.as_str(), "found parameter file");
            let text = String::from_utf8_lossy(&entry.data);
            contents.params = Some(ParamSet::from_text(&text));
        } else if !is_archive_name(&entry.path) {
            debug!(source, member = entry.path.as_str(), "found additional file");
            let staged = staging.stage(source, &entry.path, &entry.data)?;
            contents.files.push((entry.path.clone(), staged));
        }
    }
    Ok(())
}

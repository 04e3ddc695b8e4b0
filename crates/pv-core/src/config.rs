//! Merge configuration
//!
//! Paths default to the conventional folder layout next to the tool; any of
//! them can be overridden through a JSON config file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder holding the unmodified base game pak
pub const BASE_DIR_NAME: &str = "01_Original_Game_File";
/// Folder the user drops mods into
pub const MODS_DIR_NAME: &str = "02_Put_Mods_Here";
/// Folder the merged pak is written to
pub const OUTPUT_DIR_NAME: &str = "OUTPUT_Merged_Mod";

pub const BASE_ARCHIVE_NAME: &str = "data0.pak";
pub const OUTPUT_ARCHIVE_NAME: &str = "data3.pak";
pub const PARAM_PATH: &str = "scripts/player/player_variables.scr";
pub const PARAM_FILE_NAME: &str = "player_variables.scr";

/// Where to read from and write to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Base game archive holding the canonical parameter file
    pub base_archive: PathBuf,
    /// Path of the parameter file inside the base archive
    pub base_param_path: String,
    /// Folder scanned for mods
    pub mods_dir: PathBuf,
    /// Output archive
    pub output_archive: PathBuf,
    /// Path of the merged parameter file inside the output archive
    pub output_param_path: String,
    /// File name that identifies a mod's parameter file (case-insensitive)
    pub param_file_name: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::for_root(".")
    }
}

impl MergeConfig {
    /// Conventional layout under `root`
    pub fn for_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            base_archive: root.join(BASE_DIR_NAME).join(BASE_ARCHIVE_NAME),
            base_param_path: PARAM_PATH.to_string(),
            mods_dir: root.join(MODS_DIR_NAME),
            output_archive: root.join(OUTPUT_DIR_NAME).join(OUTPUT_ARCHIVE_NAME),
            output_param_path: PARAM_PATH.to_string(),
            param_file_name: PARAM_FILE_NAME.to_string(),
        }
    }

    /// Load a config from JSON; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the config as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Create the base, mods and output folders if missing
    ///
    /// Returns the folders that were newly created.
    pub fn create_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        let dirs = [
            self.base_archive.parent(),
            Some(self.mods_dir.as_path()),
            self.output_archive.parent(),
        ];
        for dir in dirs.into_iter().flatten() {
            if dir.as_os_str().is_empty() || dir.is_dir() {
                continue;
            }
            fs::create_dir_all(dir)?;
            created.push(dir.to_path_buf());
        }
        Ok(created)
    }
}

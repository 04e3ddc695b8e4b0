//! pv-core: Core library for merging player_variables.scr mods
//!
//! This library provides functionality to:
//! - Read the canonical parameter file out of the base game pak
//! - Extract parameter files and extra files from mod packages
//! - Diff each mod's `Param(...)` declarations against the base
//! - Resolve conflicting changes through a pluggable decision strategy
//! - Rewrite the base file and pack it with the extra files into one pak

pub mod archive;
pub mod aux_files;
pub mod codec;
pub mod config;
pub mod conflict;
pub mod document;
pub mod error;
pub mod intake;
pub mod merger;
pub mod params;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod staging;

pub use archive::{assemble, read_archive, read_base_member, ArchiveEntry, ArchiveKind, AssembleReport};
pub use aux_files::AuxFileRegistry;
pub use codec::extract_key;
pub use config::MergeConfig;
pub use conflict::{
    aggregate, resolve, resolve_params, Candidate, ConflictKind, ConflictMap, ConflictRequest,
    Decider, FirstChoice, LastChoice, Resolved, ScriptedChoices,
};
pub use document::BaseDocument;
pub use error::{Error, Result};
pub use intake::{collect_mods, Intake, ParamFileMatcher, SkippedMod};
pub use merger::{merge, MergeStats, MergedDocument};
pub use params::{ModParams, ParamSet};
pub use pipeline::{analyze, run_merge, Analysis, MergeOutcome};
pub use prompt::ConsolePrompt;
pub use report::{Decision, MergeReport};
pub use staging::{StagedFile, StagingArea};

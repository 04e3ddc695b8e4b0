//! Error types for pv-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pv-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The base game archive is not where the configuration says it is
    #[error("base archive not found: {0}")]
    BaseArchiveMissing(PathBuf),

    /// The base archive exists but does not hold the parameter file
    #[error("'{member}' not found inside base archive '{archive}'")]
    BaseParamMissing { archive: PathBuf, member: String },

    /// ZIP (or pak) read/write error
    #[error("ZIP error in '{path}': {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// 7-Zip read error
    #[error("7z error in '{path}': {message}")]
    SevenZip { path: PathBuf, message: String },

    /// File extension is not an archive format we can open
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(PathBuf),

    /// A decision strategy picked an option that does not exist
    #[error("invalid choice {index} for '{subject}': only {count} options")]
    InvalidChoice {
        subject: String,
        index: usize,
        count: usize,
    },

    /// Input ended while a conflict was waiting for a choice
    #[error("input closed before a conflict choice was made")]
    PromptClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

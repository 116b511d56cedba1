//! Error types for native bundle operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating, extracting, or publishing bundles.
#[derive(Debug, Error)]
pub enum LoadError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed bundle identifier.
    #[error("Invalid bundle identifier: {0}")]
    Validation(String),

    /// No archive resource exists for the platform or any fallback.
    #[error("Unable to find native bundle for {platform} [{archive}]")]
    BundleNotFound { platform: String, archive: String },

    /// Staging directory could not be created.
    #[error("Unable to create staging directory {path}: {source}")]
    StagingDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Read/write fault while streaming a single archive entry.
    #[error("Error extracting entry [{entry}] to {dest}: {source}")]
    Entry {
        entry: String,
        dest: PathBuf,
        source: std::io::Error,
    },

    /// Post-extraction verification failed or a duplicated sibling's
    /// digest does not match its source.
    #[error("Extraction integrity failure for {bundle}: {detail}")]
    Integrity { bundle: String, detail: String },
}

/// Result type for bundle operations.
pub type LoadResult<T> = Result<T, LoadError>;

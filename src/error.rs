// Repository-wide structured errors. Fatal errors (manifest/config) abort a run
// before any worker starts; `TransferError` is per-task and only ever lands in
// the failure ledger.
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while turning a manifest file into transfer tasks.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("malformed manifest {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
    /// A destination path that is absolute or escapes the output root.
    #[error("unsafe destination path in record {index}: {file_name:?} ({reason})")]
    UnsafePath { index: usize, file_name: String, reason: String },
    /// Two records normalize to the same destination file.
    #[error("records {first} and {second} both write to {}", dest.display())]
    DuplicateDestination { dest: PathBuf, first: usize, second: usize },
    /// A destination that is another record's in-flight `.part` file.
    #[error("record {index} writes to {}, the temporary file of record {owner}", dest.display())]
    TempPathCollision { dest: PathBuf, index: usize, owner: usize },
}

/// Errors in the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max workers must be a positive integer, got {0}")]
    InvalidWorkerCount(usize),
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build store client: {0}")]
    Store(String),
}

/// Per-task failure. Recorded in the failure ledger; never aborts the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("object not found in store: {0}")]
    NotFoundInStore(String),
    #[error("local write failed: {path} — {message}")]
    LocalWriteFailure { path: String, message: String },
    #[error("cannot create directory {path} — {message}")]
    DirectoryCreation { path: String, message: String },
}

impl TransferError {
    /// Short stable tag used in the JSONL failure file.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::NetworkFailure(_) => "network",
            TransferError::NotFoundInStore(_) => "not_found",
            TransferError::LocalWriteFailure { .. } => "local_write",
            TransferError::DirectoryCreation { .. } => "mkdir",
        }
    }

    pub(crate) fn local_write(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        TransferError::LocalWriteFailure {
            path: crate::paths::display_path(path).to_string(),
            message: err.to_string(),
        }
    }
}

/// Fatal errors that stop a run before any download starts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

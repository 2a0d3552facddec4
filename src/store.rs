// store module: the object-store side of a transfer
mod local;
mod s3;

use std::path::Path;

use crate::error::TransferError;

pub use local::LocalStore;
pub use s3::S3Store;

/// Blocking single-object fetch. Called from many worker threads at once.
pub trait StoreClient: Send + Sync {
    /// Copy object `key` from `bucket` into `dest`. The parent directory of
    /// `dest` already exists when this is called.
    fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), TransferError>;
}

/// Everything needed to build an [`S3Store`]; resolved before the run starts
/// instead of being read from process-wide environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub bucket: String,
    pub region: String,
    /// Named profile from the shared AWS config/credentials files.
    pub profile: Option<String>,
    /// Static access key pair; takes precedence over `profile`.
    pub credentials: Option<StaticCredentials>,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

// Rename a finished `.part` file over the destination, cleaning up on failure.
pub(crate) fn commit_part(part: &Path, dest: &Path) -> Result<(), TransferError> {
    std::fs::rename(part, dest).map_err(|e| {
        let _ = std::fs::remove_file(part);
        TransferError::local_write(dest, e)
    })
}

//! Manifest loading: a COCO for Camera Traps export becomes an ordered list of
//! [`TransferTask`]s.
//!
//! Format version 1 contract:
//! - top-level `images` array (required; may be empty)
//! - per record `serving_bucket_key` (remote key) and `file_name`
//!   (destination relative to the output root)
//!
//! Any other field, at either level, is ignored.
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ManifestError;
use crate::paths::{normalize_relative, part_path};

pub const MANIFEST_FORMAT_VERSION: u32 = 1;
pub const IMAGES_FIELD: &str = "images";
pub const KEY_FIELD: &str = "serving_bucket_key";
pub const PATH_FIELD: &str = "file_name";

/// One object to fetch. The destination is always relative and stays inside
/// the output root; [`TransferTask::new`] refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    source_key: String,
    dest_relative_path: PathBuf,
}

impl TransferTask {
    pub fn new(source_key: impl Into<String>, dest: &str) -> Result<Self, String> {
        let dest_relative_path = normalize_relative(dest)?;
        Ok(Self { source_key: source_key.into(), dest_relative_path })
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn dest_relative_path(&self) -> &Path {
        &self.dest_relative_path
    }
}

#[derive(Deserialize)]
struct CocoExport {
    images: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ImageRecord {
    serving_bucket_key: String,
    file_name: String,
}

/// Load every task in manifest order.
pub fn load(path: &Path) -> Result<Vec<TransferTask>, ManifestError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound(path.to_path_buf())
        } else {
            malformed(path, e)
        }
    })?;
    let export: CocoExport =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| malformed(path, e))?;

    let mut tasks = Vec::with_capacity(export.images.len());
    let mut seen: HashMap<PathBuf, usize> = HashMap::new();
    for (index, value) in export.images.into_iter().enumerate() {
        let rec: ImageRecord = serde_json::from_value(value)
            .map_err(|e| malformed(path, format!("record {}: {}", index, e)))?;
        let task = TransferTask::new(rec.serving_bucket_key, &rec.file_name).map_err(|reason| {
            ManifestError::UnsafePath { index, file_name: rec.file_name.clone(), reason }
        })?;
        if let Some(&first) = seen.get(task.dest_relative_path()) {
            return Err(ManifestError::DuplicateDestination {
                dest: task.dest_relative_path().to_path_buf(),
                first,
                second: index,
            });
        }
        seen.insert(task.dest_relative_path().to_path_buf(), index);
        tasks.push(task);
    }
    // a fetch stages into `<dest>.part`; no other record may own that name
    for (owner, task) in tasks.iter().enumerate() {
        let staging = part_path(task.dest_relative_path());
        if let Some(&index) = seen.get(&staging) {
            return Err(ManifestError::TempPathCollision { dest: staging, index, owner });
        }
    }
    tracing::debug!("manifest {} loaded: {} tasks", path.display(), tasks.len());
    Ok(tasks)
}

/// Load, then keep only the tasks whose key is in `keys` (manifest order kept).
/// Used to re-drive a run against the keys a previous run failed on.
pub fn load_filtered(
    path: &Path,
    keys: &HashSet<String>,
) -> Result<Vec<TransferTask>, ManifestError> {
    let mut tasks = load(path)?;
    tasks.retain(|t| keys.contains(t.source_key()));
    Ok(tasks)
}

fn malformed(path: &Path, reason: impl std::fmt::Display) -> ManifestError {
    ManifestError::Malformed { path: path.to_path_buf(), reason: reason.to_string() }
}

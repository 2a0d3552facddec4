use std::path::{Path, PathBuf};

use super::{StoreClient, commit_part};
use crate::error::TransferError;
use crate::paths::{normalize_relative, part_path};

/// Serves objects from a directory tree: `<root>/<bucket>/<key>`, or
/// `<root>/<key>` when built with [`LocalStore::flat`]. Useful for offline
/// mirrors of a bucket.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    per_bucket: bool,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), per_bucket: true }
    }

    /// Ignore the bucket name and resolve keys directly under the root.
    pub fn flat(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), per_bucket: false }
    }

    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, TransferError> {
        // keys are remote addresses; refuse ones that would read outside the root
        let rel = normalize_relative(key)
            .map_err(|reason| TransferError::NotFoundInStore(format!("{} ({})", key, reason)))?;
        Ok(if self.per_bucket { self.root.join(bucket).join(rel) } else { self.root.join(rel) })
    }
}

impl StoreClient for LocalStore {
    fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), TransferError> {
        let src = self.resolve(bucket, key)?;
        if !src.is_file() {
            return Err(TransferError::NotFoundInStore(key.to_string()));
        }
        let part = part_path(dest);
        if let Err(e) = std::fs::copy(&src, &part) {
            let _ = std::fs::remove_file(&part);
            return Err(TransferError::local_write(dest, e));
        }
        commit_part(&part, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_from_bucket_directory() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("bkt").join("a")).unwrap();
        std::fs::write(src.path().join("bkt").join("a").join("1.jpg"), b"jpeg").unwrap();

        let store = LocalStore::new(src.path());
        let dest = out.path().join("1.jpg");
        store.fetch("bkt", "a/1.jpg", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg");
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn flat_store_ignores_bucket() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("x.jpg"), b"x").unwrap();
        let store = LocalStore::flat(src.path());
        store.fetch("whatever", "x.jpg", &out.path().join("x.jpg")).unwrap();
    }

    #[test]
    fn missing_key_is_not_found() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let store = LocalStore::new(src.path());
        let err = store.fetch("bkt", "nope.jpg", &out.path().join("n.jpg")).unwrap_err();
        assert_eq!(err, TransferError::NotFoundInStore("nope.jpg".to_string()));
        assert!(!out.path().join("n.jpg").exists());
    }

    #[test]
    fn traversal_key_is_refused() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let store = LocalStore::flat(src.path());
        let err = store.fetch("b", "../secret", &out.path().join("s")).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}

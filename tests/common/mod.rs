#![allow(dead_code)]
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use imgpull::TransferError;
use imgpull::store::StoreClient;

/// In-memory store double: writes the key as file content, fails the keys it
/// was told to fail, and remembers every fetch it saw.
pub struct ScriptedStore {
    fail_keys: HashSet<String>,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedStore {
    pub fn always_ok() -> Self {
        Self { fail_keys: HashSet::new(), delay: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl StoreClient for ScriptedStore {
    fn fetch(&self, _bucket: &str, key: &str, dest: &Path) -> Result<(), TransferError> {
        self.calls.lock().unwrap().push(key.to_string());
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        if self.fail_keys.contains(key) {
            return Err(TransferError::NetworkFailure(format!("simulated failure for {}", key)));
        }
        std::fs::write(dest, key.as_bytes()).map_err(|e| TransferError::LocalWriteFailure {
            path: dest.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Write a COCO export with one image record per `(key, file_name)` pair.
pub fn write_coco(dir: &Path, records: &[(&str, &str)]) -> PathBuf {
    let images: Vec<serde_json::Value> = records
        .iter()
        .enumerate()
        .map(|(i, (key, file_name))| {
            serde_json::json!({
                "id": format!("img-{}", i),
                "serving_bucket_key": key,
                "file_name": file_name,
                "width": 1920,
                "height": 1080,
            })
        })
        .collect();
    let doc = serde_json::json!({
        "info": {"description": "test export"},
        "images": images,
        "annotations": [],
        "categories": [],
    });
    let path = dir.join("export_coco.json");
    let mut f = std::fs::File::create(&path).expect("create manifest");
    f.write_all(doc.to_string().as_bytes()).expect("write manifest");
    path
}

/// Count regular files under `root`, recursively.
pub fn count_files(root: &Path) -> usize {
    let Ok(rd) = std::fs::read_dir(root) else {
        return 0;
    };
    rd.flatten()
        .map(|e| {
            let p = e.path();
            if p.is_dir() { count_files(&p) } else { 1 }
        })
        .sum()
}

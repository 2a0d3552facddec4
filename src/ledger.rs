use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// One task that did not make it to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub key: String,
    pub kind: String,
    pub reason: String,
}

/// `kind` of a record for a task that was still queued when the workers exited.
pub const NOT_ATTEMPTED_KIND: &str = "not_attempted";

impl FailureRecord {
    pub fn new(key: &str, err: &TransferError) -> Self {
        Self { key: key.to_string(), kind: err.kind().to_string(), reason: err.to_string() }
    }

    pub fn not_attempted(key: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: NOT_ATTEMPTED_KIND.to_string(),
            reason: "not attempted".to_string(),
        }
    }

    pub fn is_not_attempted(&self) -> bool {
        self.kind == NOT_ATTEMPTED_KIND
    }
}

/// Append-only failure collection shared by all workers. Read once, after
/// every worker has been joined, through [`FailureLedger::into_records`].
#[derive(Clone)]
pub struct FailureLedger {
    tx: Sender<FailureRecord>,
    rx: Receiver<FailureRecord>,
}

impl Default for FailureLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureLedger {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn record(&self, key: &str, err: &TransferError) {
        // we hold the receiver ourselves, so the channel is never disconnected
        let _ = self.tx.send(FailureRecord::new(key, err));
    }

    /// Park a key that no worker ever dequeued so it can be re-driven.
    pub fn record_not_attempted(&self, key: &str) {
        let _ = self.tx.send(FailureRecord::not_attempted(key));
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Drain everything recorded so far, in arrival order.
    pub fn into_records(self) -> Vec<FailureRecord> {
        self.rx.try_iter().collect()
    }
}

/// Default location for a run's failure file: `<dir>/failures-<UTC>.jsonl`.
pub fn default_failures_path(dir: &Path) -> PathBuf {
    dir.join(format!("failures-{}.jsonl", Utc::now().format("%Y%m%dT%H%M%SZ")))
}

/// Write failures as JSON Lines (append mode, parent directory created).
pub fn write_failures_jsonl(path: &Path, failures: &[FailureRecord]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    for rec in failures {
        let line = serde_json::to_string(rec).map_err(std::io::Error::other)?;
        writeln!(f, "{}", line)?;
    }
    f.flush()
}

/// Read the keys back out of a failures file so a follow-up run can retry them.
/// Blank lines are skipped; a line that is not a failure record is an error.
pub fn read_failed_keys(path: &Path) -> std::io::Result<HashSet<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut keys = HashSet::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: FailureRecord = serde_json::from_str(&line).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}:{}: {}", path.display(), n + 1, e),
            )
        })?;
        keys.insert(rec.key);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_from_many_threads() {
        let ledger = FailureLedger::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for n in 0..25 {
                        let err = TransferError::NetworkFailure(format!("t{i}"));
                        ledger.record(&format!("k-{i}-{n}"), &err);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let records = ledger.into_records();
        assert_eq!(records.len(), 100);
        let keys: HashSet<_> = records.iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn jsonl_keys_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("failures.jsonl");
        let failures = vec![
            FailureRecord::new("a/1.jpg", &TransferError::NotFoundInStore("a/1.jpg".into())),
            FailureRecord::new("b/2.jpg", &TransferError::NetworkFailure("reset".into())),
        ];
        write_failures_jsonl(&path, &failures).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"kind\":\"not_found\""));

        let keys = read_failed_keys(&path).unwrap();
        assert!(keys.contains("a/1.jpg"));
        assert!(keys.contains("b/2.jpg"));
    }

    #[test]
    fn not_attempted_keys_are_re_drivable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures.jsonl");
        let ledger = FailureLedger::new();
        ledger.record("k1", &TransferError::NetworkFailure("reset".into()));
        ledger.record_not_attempted("k2");
        let records = ledger.into_records();
        assert!(!records[0].is_not_attempted());
        assert!(records[1].is_not_attempted());

        write_failures_jsonl(&path, &records).unwrap();
        let keys = read_failed_keys(&path).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("k2"));
    }

    #[test]
    fn garbage_line_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"key\":\"a\",\"kind\":\"x\",\"reason\":\"y\"}\nnope\n").unwrap();
        let err = read_failed_keys(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn default_path_lives_in_dir() {
        let p = default_failures_path(Path::new("/tmp/logs"));
        assert!(p.starts_with("/tmp/logs"));
        assert_eq!(p.extension().and_then(|e| e.to_str()), Some("jsonl"));
    }
}

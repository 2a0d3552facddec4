mod common;

use std::sync::Arc;

use common::write_coco;
use imgpull::store::LocalStore;
use imgpull::{ManifestError, Orchestrator, RunError, RunOptions, RunOutcome};

#[test]
fn mirror_directory_round_trip() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let bucket_dir = src.path().join("serving");
    std::fs::create_dir_all(bucket_dir.join("orig")).unwrap();
    std::fs::write(bucket_dir.join("orig").join("1.jpg"), b"one").unwrap();
    std::fs::write(bucket_dir.join("orig").join("2.jpg"), b"two").unwrap();

    let manifest = write_coco(
        work.path(),
        &[
            ("orig/1.jpg", "cam/1.jpg"),
            ("orig/2.jpg", "cam/2.jpg"),
            ("orig/missing.jpg", "cam/3.jpg"),
        ],
    );
    let out = work.path().join("out");
    let mut orch = Orchestrator::new(
        Arc::new(LocalStore::new(src.path())),
        RunOptions { bucket: "serving".to_string(), ..Default::default() },
    );
    let summary = orch.run(&manifest, &out).unwrap();

    assert_eq!(summary.outcome, RunOutcome::CompletedWithFailures);
    assert_eq!((summary.completed, summary.failed), (2, 1));
    assert_eq!(summary.failures[0].kind, "not_found");
    assert_eq!(std::fs::read(out.join("cam/2.jpg")).unwrap(), b"two");
    assert!(!out.join("cam/3.jpg").exists());
    assert!(!out.join("cam/3.jpg.part").exists());
}

#[test]
fn staging_name_clash_is_refused_before_any_fetch() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let bucket_dir = src.path().join("serving");
    std::fs::create_dir_all(&bucket_dir).unwrap();
    std::fs::write(bucket_dir.join("x"), b"XXXX").unwrap();
    std::fs::write(bucket_dir.join("y"), b"YYYY").unwrap();

    let manifest = write_coco(work.path(), &[("x", "a.jpg.part"), ("y", "a.jpg")]);
    let out = work.path().join("out");
    let mut orch = Orchestrator::new(
        Arc::new(LocalStore::new(src.path())),
        RunOptions { bucket: "serving".to_string(), max_workers: Some(1), ..Default::default() },
    );
    let err = orch.run(&manifest, &out).unwrap_err();

    assert!(matches!(err, RunError::Manifest(ManifestError::TempPathCollision { .. })));
    assert!(!out.exists());
}

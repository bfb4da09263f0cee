use tempfile::tempdir;

use crate::test_utils::enable_logger;
use crate::Error;
use crate::FsStorageEngine;
use crate::StorageEngine;
use crate::StorageError;
use crate::StorageFile;

#[test]
fn test_auxiliary_dir_nests_under_root() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());

    assert_eq!(engine.auxiliary_dir(), dir.path().join("auxiliary"));
    // Reporting the directory involves no I/O.
    assert!(!engine.auxiliary_dir().exists());
}

#[test]
fn test_create_dir_all_is_idempotent() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());
    let nested = dir.path().join("a").join("b").join("c");

    engine.create_dir_all(&nested).unwrap();
    engine.create_dir_all(&nested).unwrap();
    assert!(nested.is_dir());
}

/// Creation is exclusive: a second create of the same path fails with the
/// offending path attached.
#[test]
fn test_create_is_exclusive() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());
    let path = dir.path().join("0.sst");

    let _file = engine.create(&path).unwrap();
    let e = engine.create(&path).unwrap_err();
    assert!(matches!(
        e,
        Error::Storage(StorageError::PathError { .. })
    ));
}

#[test]
fn test_write_sync_close_roundtrip() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());
    let path = dir.path().join("0.sst");

    let mut file = engine.create(&path).unwrap();
    assert_eq!(file.write(b"hello ").unwrap(), 6);
    assert_eq!(file.write(b"world").unwrap(), 5);
    file.sync().unwrap();
    file.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
}

/// Writes after close fail at the handle level as well.
#[test]
fn test_write_after_close_fails() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());
    let path = dir.path().join("0.sst");

    let mut file = engine.create(&path).unwrap();
    file.write(b"bytes").unwrap();
    file.close().unwrap();

    assert!(file.write(b"more").is_err());
    assert!(file.sync().is_err());
}

/// Periodic syncing must not disturb the written byte stream.
#[test]
fn test_create_with_sync_keeps_contents_intact() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());
    let path = dir.path().join("0.sst");

    let mut file = engine.create_with_sync(&path, 8).unwrap();
    let mut expected = Vec::new();
    for chunk in 0..10u8 {
        let data = vec![chunk; 5];
        file.write(&data).unwrap();
        expected.extend_from_slice(&data);
    }
    file.sync().unwrap();
    file.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), expected);
}

#[test]
fn test_remove_dir_all_tolerates_missing_path() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());

    engine.remove_dir_all(&dir.path().join("never-created")).unwrap();
}

#[test]
fn test_remove_dir_all_is_recursive() {
    enable_logger();
    let dir = tempdir().unwrap();
    let engine = FsStorageEngine::new(dir.path());
    let root = dir.path().join("tree");
    let nested = root.join("a").join("b");

    engine.create_dir_all(&nested).unwrap();
    let mut file = engine.create(&nested.join("0.sst")).unwrap();
    file.write(b"x").unwrap();
    file.close().unwrap();

    engine.remove_dir_all(&root).unwrap();
    assert!(!root.exists());
}

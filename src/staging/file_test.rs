use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::test_utils::enable_logger;
use crate::test_utils::staging_fixture;
use crate::test_utils::staging_fixture_with_limiter;
use crate::BulkIoRateLimiter;
use crate::Error;
use crate::StagingError;
use crate::StorageError;

/// Closing a file that was never written must fail: an empty SST can never
/// be ingested, so it is caught at close time.
#[tokio::test]
async fn test_close_unwritten_file_is_rejected() {
    enable_logger();
    let fixture = staging_fixture();
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();

    let e = file.close().unwrap_err();
    assert!(matches!(
        e,
        Error::Storage(StorageError::Staging(StagingError::EmptyFile))
    ));

    scratch.close().unwrap();
}

/// Write, sync, close; the second close is a no-op success.
#[tokio::test]
async fn test_close_is_idempotent_once_written() {
    enable_logger();
    let fixture = staging_fixture();
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();
    file.write(b"sorted table bytes").await.unwrap();
    file.sync().unwrap();
    file.close().unwrap();
    file.close().unwrap();

    scratch.close().unwrap();
}

/// Released files do not reopen: writing or syncing after close fails.
#[tokio::test]
async fn test_write_after_close_fails() {
    enable_logger();
    let fixture = staging_fixture();
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();
    file.write(b"bytes").await.unwrap();
    file.sync().unwrap();
    file.close().unwrap();

    let e = file.write(b"more").await.unwrap_err();
    assert!(matches!(
        e,
        Error::Storage(StorageError::Staging(StagingError::FileAlreadyClosed))
    ));
    let e = file.sync().unwrap_err();
    assert!(matches!(
        e,
        Error::Storage(StorageError::Staging(StagingError::FileAlreadyClosed))
    ));

    scratch.close().unwrap();
}

/// An empty write succeeds without materializing anything on disk.
#[tokio::test]
async fn test_empty_write_does_not_materialize() {
    enable_logger();
    let fixture = staging_fixture();
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();

    assert_eq!(file.write(b"").await.unwrap(), 0);
    assert!(!file.path().exists());
    assert!(!scratch.snap_dir().exists());

    scratch.close().unwrap();
}

/// Syncing a file that was never written is a usage error, not a crash.
#[tokio::test]
async fn test_sync_unwritten_file_is_rejected() {
    enable_logger();
    let fixture = staging_fixture();
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();

    let e = file.sync().unwrap_err();
    assert!(matches!(
        e,
        Error::Storage(StorageError::Staging(StagingError::EmptyFile))
    ));

    scratch.close().unwrap();
}

/// A stale file handle must not materialize under a scratch that has since
/// been closed.
#[tokio::test]
async fn test_write_on_stale_handle_after_scratch_close_fails() {
    enable_logger();
    let fixture = staging_fixture();
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();
    scratch.close().unwrap();

    let e = file.write(b"stale").await.unwrap_err();
    assert!(matches!(
        e,
        Error::Storage(StorageError::Staging(StagingError::ScratchClosed))
    ));
    assert!(!file.path().exists());
}

/// A context cancelled while the write waits for admission fails the write
/// and leaves the file contents untouched.
#[tokio::test]
async fn test_cancelled_write_leaves_file_unmodified() {
    enable_logger();
    // Budget of 16 bytes per second; the second write cannot be admitted
    // within the test's lifetime.
    let limiter = Arc::new(BulkIoRateLimiter::new(16));
    let fixture = staging_fixture_with_limiter(limiter);
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();
    file.write(b"kept").await.unwrap();

    let payload = vec![0u8; 64];
    let (res, ()) = tokio::join!(file.write(&payload), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.cancel();
    });
    assert!(matches!(
        res.unwrap_err(),
        Error::Storage(StorageError::Cancelled)
    ));

    file.sync().unwrap();
    file.close().unwrap();
    assert_eq!(std::fs::read(file.path()).unwrap(), b"kept");

    scratch.close().unwrap();
}

/// A token that is already cancelled never admits the write at all.
#[tokio::test]
async fn test_precancelled_write_is_rejected() {
    enable_logger();
    let fixture = staging_fixture();
    let ctx = CancellationToken::new();
    ctx.cancel();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();

    let e = file.write(b"never admitted").await.unwrap_err();
    assert!(matches!(
        e,
        Error::Storage(StorageError::Cancelled)
    ));

    scratch.close().unwrap();
}

/// Admission is requested for exactly the written byte count: after a
/// 1-byte write against a 2-byte budget, only one more byte fits.
#[tokio::test]
async fn test_admission_consumes_exactly_written_bytes() {
    enable_logger();
    let limiter = Arc::new(BulkIoRateLimiter::new(2));
    let fixture = staging_fixture_with_limiter(limiter.clone());
    let ctx = CancellationToken::new();

    let scratch = fixture.area.new_scratch_space(1, Uuid::new_v4());
    let mut file = scratch.new_file(ctx.clone(), 0).unwrap();
    file.write(b"x").await.unwrap();

    assert!(!limiter.try_admit(2));
    assert!(limiter.try_admit(1));

    file.sync().unwrap();
    file.close().unwrap();
    scratch.close().unwrap();
}

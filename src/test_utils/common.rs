use std::sync::Arc;

use tempfile::TempDir;

use crate::BulkIoRateLimiter;
use crate::FsStorageEngine;
use crate::SnapshotStagingArea;
use crate::SnapshotStagingConfig;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Staging area backed by a throwaway store directory.
pub(crate) struct StagingFixture {
    pub(crate) area: SnapshotStagingArea,
    pub(crate) limiter: Arc<BulkIoRateLimiter>,
    /// Held so the store root outlives the test body.
    pub(crate) _store_dir: TempDir,
}

pub(crate) fn staging_fixture() -> StagingFixture {
    staging_fixture_with_limiter(Arc::new(BulkIoRateLimiter::unlimited()))
}

pub(crate) fn staging_fixture_with_limiter(limiter: Arc<BulkIoRateLimiter>) -> StagingFixture {
    let store_dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FsStorageEngine::new(store_dir.path()));
    let area = SnapshotStagingArea::new(
        engine,
        limiter.clone(),
        &SnapshotStagingConfig::default(),
    );
    StagingFixture {
        area,
        limiter,
        _store_dir: store_dir,
    }
}

use std::fmt::Debug;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::constants::STAGING_DIR_NAME;
use crate::metrics::OPEN_SCRATCHES_GAUGE;
use crate::metrics::RANGE_DIR_RECLAIM_FAILURES;
use crate::BulkIoRateLimiter;
use crate::Result;
use crate::SnapshotScratch;
use crate::SnapshotStagingConfig;
use crate::StorageEngine;

/// Identifier of a contiguous replicated keyspace partition.
pub type RangeId = u64;

/// Registry for the snapshot staging namespace of one storage engine.
///
/// Owns `<auxiliary>/sstsnapshot`, the shared bulk-write limiter, and a
/// per-range count of the scratch spaces that currently require the range's
/// parent directory to remain present. Cloning yields another handle to the
/// same registry; one instance serves the whole store.
#[derive(Clone)]
pub struct SnapshotStagingArea {
    inner: Arc<StagingAreaInner>,
}

struct StagingAreaInner {
    engine: Arc<dyn StorageEngine>,
    limiter: Arc<BulkIoRateLimiter>,
    root_dir: PathBuf,
    bytes_per_sync: usize,
    range_refs: DashMap<RangeId, usize>,
}

impl SnapshotStagingArea {
    /// Creates the staging registry for `engine`. Performs no filesystem
    /// I/O; directories materialize lazily as scratches stage files.
    pub fn new(
        engine: Arc<dyn StorageEngine>,
        limiter: Arc<BulkIoRateLimiter>,
        config: &SnapshotStagingConfig,
    ) -> Self {
        let root_dir = engine.auxiliary_dir().join(STAGING_DIR_NAME);
        Self {
            inner: Arc::new(StagingAreaInner {
                engine,
                limiter,
                root_dir,
                bytes_per_sync: config.bytes_per_sync,
                range_refs: DashMap::new(),
            }),
        }
    }

    /// Opens a scratch space for one snapshot attempt of `range_id`.
    ///
    /// Registers the scratch in the range's reference count. Multiple
    /// attempts for the same range may be open concurrently; each gets its
    /// own directory keyed by `snapshot_id`.
    pub fn new_scratch_space(
        &self,
        range_id: RangeId,
        snapshot_id: Uuid,
    ) -> SnapshotScratch {
        *self.inner.range_refs.entry(range_id).or_insert(0) += 1;
        OPEN_SCRATCHES_GAUGE.inc();

        let snap_dir = self
            .inner
            .root_dir
            .join(range_id.to_string())
            .join(snapshot_id.to_string());
        SnapshotScratch::new(self.clone(), range_id, snap_dir)
    }

    /// Removes the entire staging namespace. Full-storage teardown only;
    /// per-snapshot cleanup goes through [`SnapshotScratch::close`].
    pub fn clear(&self) -> Result<()> {
        self.inner.engine.remove_dir_all(&self.inner.root_dir)
    }

    pub fn root_dir(&self) -> &Path {
        &self.inner.root_dir
    }

    pub(crate) fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.inner.engine
    }

    pub(crate) fn limiter(&self) -> &Arc<BulkIoRateLimiter> {
        &self.inner.limiter
    }

    pub(crate) fn default_bytes_per_sync(&self) -> usize {
        self.inner.bytes_per_sync
    }

    /// Runs exactly once per scratch close.
    ///
    /// An underflowing count means scratch lifecycle accounting is already
    /// corrupted; that is a bug in this crate or its caller, not a runtime
    /// condition, so it aborts instead of returning an error.
    pub(crate) fn scratch_closed(
        &self,
        range_id: RangeId,
    ) {
        let last_for_range = match self.inner.range_refs.entry(range_id) {
            Entry::Occupied(mut entry) => {
                let count = entry.get_mut();
                if *count == 0 {
                    panic!("inconsistent scratch ref count for range {range_id}");
                }
                *count -= 1;
                if *count == 0 {
                    entry.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => {
                panic!("inconsistent scratch ref count for range {range_id}")
            }
        };
        OPEN_SCRATCHES_GAUGE.dec();

        if last_for_range {
            // An orphaned range directory slows later directory walks but is
            // never a correctness problem, so the closing caller must not
            // fail on this removal.
            let range_dir = self.inner.root_dir.join(range_id.to_string());
            match self.inner.engine.remove_dir_all(&range_dir) {
                Ok(()) => {
                    debug!(range_id, "reclaimed range staging directory");
                }
                Err(e) => {
                    RANGE_DIR_RECLAIM_FAILURES.inc();
                    warn!(range_id, ?range_dir, "failed to reclaim range staging directory: {e}");
                }
            }
        }
    }
}

impl Debug for SnapshotStagingArea {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SnapshotStagingArea")
            .field("root_dir", &self.inner.root_dir)
            .field("open_ranges", &self.inner.range_refs.len())
            .finish()
    }
}

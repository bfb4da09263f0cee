use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::constants::SST_FILE_EXTENSION;
use crate::errors::StagingError;
use crate::RangeId;
use crate::Result;
use crate::SnapshotStagingArea;
use crate::StagingFile;

/// Scratch space of a single in-flight snapshot attempt for one range.
///
/// Tracks the SST files incrementally created while the snapshot streams
/// in. The owner must close the scratch exactly once when the attempt
/// concludes, whether it succeeded or was abandoned, to release its
/// directory and its claim on the range's parent directory. A scratch and
/// its files are meant for single-owner sequential use; callers serialize
/// access to a given scratch.
pub struct SnapshotScratch {
    shared: Arc<ScratchShared>,
}

/// State shared between a scratch and the staging files it hands out.
pub(crate) struct ScratchShared {
    area: SnapshotStagingArea,
    range_id: RangeId,
    snap_dir: PathBuf,
    state: Mutex<ScratchState>,
}

#[derive(Default)]
struct ScratchState {
    /// Paths allocated so far, in creation order. Append-only: entries stay
    /// even when writing the file later fails, and names are never reused.
    ssts: Vec<PathBuf>,
    dir_created: bool,
    closed: bool,
}

impl ScratchShared {
    pub(crate) fn area(&self) -> &SnapshotStagingArea {
        &self.area
    }

    /// Materializes the snapshot directory. Deferred until a first file
    /// needs it so an attempt that stages nothing leaves nothing behind.
    pub(crate) fn create_dir(&self) -> Result<()> {
        let res = self.area.engine().create_dir_all(&self.snap_dir);
        let mut state = self.state.lock();
        state.dir_created = state.dir_created || res.is_ok();
        res
    }

    pub(crate) fn dir_created(&self) -> bool {
        self.state.lock().dir_created
    }

    pub(crate) fn closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl SnapshotScratch {
    pub(crate) fn new(
        area: SnapshotStagingArea,
        range_id: RangeId,
        snap_dir: PathBuf,
    ) -> Self {
        Self {
            shared: Arc::new(ScratchShared {
                area,
                range_id,
                snap_dir,
                state: Mutex::new(ScratchState::default()),
            }),
        }
    }

    pub fn range_id(&self) -> RangeId {
        self.shared.range_id
    }

    pub fn snap_dir(&self) -> &Path {
        &self.shared.snap_dir
    }

    fn filename(
        &self,
        id: usize,
    ) -> PathBuf {
        self.shared.snap_dir.join(format!("{id}.{SST_FILE_EXTENSION}"))
    }

    /// Allocates the next staging file of this scratch.
    ///
    /// The file is lazily created on its first write. A nonzero
    /// `bytes_per_sync` asks the engine to sync dirty data periodically as
    /// it is written; that only smooths disk writes, and [`StagingFile::sync`]
    /// must still be called before the file counts as persisted.
    pub fn new_file(
        &self,
        ctx: CancellationToken,
        bytes_per_sync: usize,
    ) -> Result<StagingFile> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(StagingError::ScratchClosed.into());
        }

        let filename = self.filename(state.ssts.len());
        state.ssts.push(filename.clone());
        Ok(StagingFile::new(
            Arc::clone(&self.shared),
            filename,
            ctx,
            bytes_per_sync,
        ))
    }

    /// Stages one complete SST payload: allocate, write, sync, close.
    ///
    /// An empty payload stages nothing and succeeds; an empty SST can
    /// never be ingested, so none may appear in the manifest. The file is
    /// closed even when writing or syncing failed; the original failure is
    /// what propagates.
    pub async fn write_sst(
        &self,
        ctx: &CancellationToken,
        data: &[u8],
    ) -> Result<()> {
        if self.shared.state.lock().closed {
            return Err(StagingError::ScratchClosed.into());
        }
        if data.is_empty() {
            return Ok(());
        }

        let mut file = self.new_file(ctx.clone(), self.shared.area.default_bytes_per_sync())?;
        let staged: Result<()> = async {
            file.write(data).await?;
            file.sync()?;
            Ok(())
        }
        .await;

        match staged {
            Ok(()) => file.close(),
            Err(e) => {
                // Nothing actionable if this close fails; the write or sync
                // failure is what the caller acts on.
                let _ = file.close();
                Err(e)
            }
        }
    }

    /// The manifest of file paths allocated so far, in creation order.
    /// This is what gets handed to the engine's ingestion routine once the
    /// snapshot is complete.
    pub fn ssts(&self) -> Vec<PathBuf> {
        self.shared.state.lock().ssts.clone()
    }

    /// Releases the scratch: removes its directory and drops its claim on
    /// the range's parent directory. Idempotent; only the first call does
    /// work. The reference-count release runs even when directory removal
    /// fails; the removal error, if any, is returned.
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
        }
        debug!(range_id = self.shared.range_id, snap_dir = ?self.shared.snap_dir, "closing snapshot scratch space");

        let _release = ScratchCloseGuard {
            area: &self.shared.area,
            range_id: self.shared.range_id,
        };
        self.shared.area.engine().remove_dir_all(&self.shared.snap_dir)
    }
}

/// Drop-driven reference-count release so the accounting update cannot be
/// skipped by an early return from the removal path.
struct ScratchCloseGuard<'a> {
    area: &'a SnapshotStagingArea,
    range_id: RangeId,
}

impl Drop for ScratchCloseGuard<'_> {
    fn drop(&mut self) {
        self.area.scratch_closed(self.range_id);
    }
}

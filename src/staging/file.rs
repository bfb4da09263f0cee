use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::errors::StagingError;
use crate::metrics::STAGED_BYTES_TOTAL;
use crate::staging::scratch::ScratchShared;
use crate::Result;
use crate::StorageFile;

/// One lazily-created SST output file owned by a `SnapshotScratch`.
///
/// The file advances through exactly three states: allocated but never
/// opened, open, and released. It opens on its first non-empty write, so an
/// allocated file that is never written leaves no trace on disk. The caller
/// closes it exactly once; an explicit [`StagingFile::sync`] before that
/// close is what makes the staged bytes durable.
pub struct StagingFile {
    scratch: Arc<ScratchShared>,
    filename: PathBuf,
    state: FileState,
    bytes_per_sync: usize,
    ctx: CancellationToken,
}

enum FileState {
    Unmaterialized,
    Open(Box<dyn StorageFile>),
    Released,
}

impl StagingFile {
    pub(crate) fn new(
        scratch: Arc<ScratchShared>,
        filename: PathBuf,
        ctx: CancellationToken,
        bytes_per_sync: usize,
    ) -> Self {
        Self {
            scratch,
            filename,
            state: FileState::Unmaterialized,
            bytes_per_sync,
            ctx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.filename
    }

    fn ensure_materialized(&mut self) -> Result<()> {
        match self.state {
            FileState::Open(_) => return Ok(()),
            FileState::Released => return Err(StagingError::FileAlreadyClosed.into()),
            FileState::Unmaterialized => {}
        }

        if !self.scratch.dir_created() {
            self.scratch.create_dir()?;
        }
        // The scratch may have been closed while this handle sat unused; its
        // directory is gone again, so the file must not open under it.
        if self.scratch.closed() {
            return Err(StagingError::ScratchClosed.into());
        }

        let engine = self.scratch.area().engine();
        let file = if self.bytes_per_sync > 0 {
            engine.create_with_sync(&self.filename, self.bytes_per_sync)?
        } else {
            engine.create(&self.filename)?
        };
        self.state = FileState::Open(file);
        Ok(())
    }

    /// Writes `contents` under the store's shared bulk-I/O admission
    /// budget.
    ///
    /// Empty input is a no-op success and does not materialize the file.
    /// Admission is requested for exactly `contents.len()` bytes and may
    /// suspend the caller; if the file's cancellation token fires first,
    /// the write fails without touching the file.
    pub async fn write(
        &mut self,
        contents: &[u8],
    ) -> Result<usize> {
        if contents.is_empty() {
            return Ok(0);
        }
        self.ensure_materialized()?;

        let limiter = Arc::clone(self.scratch.area().limiter());
        let ctx = self.ctx.clone();
        limiter.admit(contents.len() as u64, &ctx).await?;

        match &mut self.state {
            FileState::Open(file) => {
                let n = file.write(contents)?;
                STAGED_BYTES_TOTAL.inc_by(n as u64);
                Ok(n)
            }
            // ensure_materialized left the file open and nothing else
            // transitions state during a write.
            _ => Err(StagingError::FileAlreadyClosed.into()),
        }
    }

    /// Forces durability of everything written so far. Periodic syncing
    /// configured at creation never substitutes for this call: the file may
    /// only be referenced from a crash-surviving manifest after an explicit
    /// sync followed by close.
    pub fn sync(&mut self) -> Result<()> {
        match &mut self.state {
            FileState::Unmaterialized => Err(StagingError::EmptyFile.into()),
            FileState::Released => Err(StagingError::FileAlreadyClosed.into()),
            FileState::Open(file) => file.sync(),
        }
    }

    /// Closes the file. Idempotent once open. A file that was never written
    /// is rejected here: it would be an error to ingest an empty SST, so it
    /// is caught early.
    pub fn close(&mut self) -> Result<()> {
        match &mut self.state {
            FileState::Unmaterialized => Err(StagingError::EmptyFile.into()),
            FileState::Released => Ok(()),
            FileState::Open(file) => {
                file.close()?;
                self.state = FileState::Released;
                Ok(())
            }
        }
    }
}

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::constants::AUXILIARY_DIR_NAME;
use crate::errors::StagingError;
use crate::StorageEngine;
use crate::StorageError;
use crate::StorageFile;
use crate::Result;

/// Local-filesystem implementation of the engine boundary.
///
/// Suitable for stores whose auxiliary data lives directly on a local disk.
#[derive(Debug)]
pub struct FsStorageEngine {
    root_dir: PathBuf,
}

impl FsStorageEngine {
    /// Creates an engine rooted at the store directory. No I/O happens
    /// until a directory or file operation is requested.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn open_exclusive(
        &self,
        path: &Path,
        bytes_per_sync: usize,
    ) -> Result<Box<dyn StorageFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| StorageError::PathError {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, bytes_per_sync, "created staging file");
        Ok(Box::new(FsFile {
            file: Some(file),
            bytes_per_sync,
            dirty_bytes: 0,
        }))
    }
}

impl StorageEngine for FsStorageEngine {
    fn auxiliary_dir(&self) -> PathBuf {
        self.root_dir.join(AUXILIARY_DIR_NAME)
    }

    fn create_dir_all(
        &self,
        path: &Path,
    ) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| {
            StorageError::PathError {
                path: path.to_path_buf(),
                source: e,
            }
            .into()
        })
    }

    fn create(
        &self,
        path: &Path,
    ) -> Result<Box<dyn StorageFile>> {
        self.open_exclusive(path, 0)
    }

    fn create_with_sync(
        &self,
        path: &Path,
        bytes_per_sync: usize,
    ) -> Result<Box<dyn StorageFile>> {
        self.open_exclusive(path, bytes_per_sync)
    }

    fn remove_dir_all(
        &self,
        path: &Path,
    ) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            // Removal of a path that was never materialized is a no-op.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::PathError {
                path: path.to_path_buf(),
                source: e,
            }
            .into()),
        }
    }
}

/// File handle with optional periodic data syncing.
struct FsFile {
    file: Option<File>,
    bytes_per_sync: usize,
    dirty_bytes: usize,
}

impl StorageFile for FsFile {
    fn write(
        &mut self,
        data: &[u8],
    ) -> Result<usize> {
        let file = self.file.as_mut().ok_or(StagingError::FileAlreadyClosed)?;
        file.write_all(data).map_err(StorageError::IoError)?;
        if self.bytes_per_sync > 0 {
            self.dirty_bytes += data.len();
            if self.dirty_bytes >= self.bytes_per_sync {
                file.sync_data().map_err(StorageError::IoError)?;
                self.dirty_bytes = 0;
            }
        }
        Ok(data.len())
    }

    fn sync(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(StagingError::FileAlreadyClosed)?;
        file.sync_data().map_err(StorageError::IoError)?;
        self.dirty_bytes = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle closes the descriptor. Repeated closes are
        // harmless at this level; the caller-facing idempotency contract
        // lives in StagingFile.
        self.file.take();
        Ok(())
    }
}

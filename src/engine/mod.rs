mod fs_engine;

#[cfg(test)]
mod fs_engine_test;

use std::path::Path;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

pub use fs_engine::*;

use crate::Result;

/// Directory and file primitives the staging layer requires from the
/// underlying storage engine.
///
/// The staging layer never touches the filesystem directly; everything goes
/// through this boundary so stores can route staging I/O through their own
/// filesystem abstraction.
#[cfg_attr(test, automock)]
pub trait StorageEngine: Send + Sync + 'static {
    /// Root auxiliary directory under which staging namespaces nest.
    fn auxiliary_dir(&self) -> PathBuf;

    /// Creates every directory along `path`; succeeds if they already
    /// exist.
    fn create_dir_all(
        &self,
        path: &Path,
    ) -> Result<()>;

    /// Creates a new file at `path` for exclusive writing.
    fn create(
        &self,
        path: &Path,
    ) -> Result<Box<dyn StorageFile>>;

    /// Like [`StorageEngine::create`], additionally syncing dirty data every
    /// `bytes_per_sync` written bytes to smooth out disk writes. The
    /// periodic syncing carries no durability guarantee.
    fn create_with_sync(
        &self,
        path: &Path,
        bytes_per_sync: usize,
    ) -> Result<Box<dyn StorageFile>>;

    /// Recursively removes `path` and its contents; succeeds if absent.
    fn remove_dir_all(
        &self,
        path: &Path,
    ) -> Result<()>;
}

/// An open engine file handle.
#[cfg_attr(test, automock)]
pub trait StorageFile: Send {
    fn write(
        &mut self,
        data: &[u8],
    ) -> Result<usize>;

    /// Forces everything written so far to durable storage.
    fn sync(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

// -
// Staging namespace

/// Name of the staging namespace nested under the engine's auxiliary
/// directory.
pub(crate) const STAGING_DIR_NAME: &str = "sstsnapshot";

/// Extension of staged sorted-table files.
pub(crate) const SST_FILE_EXTENSION: &str = "sst";

/// Auxiliary directory exposed by the filesystem engine under its store
/// root.
pub(crate) const AUXILIARY_DIR_NAME: &str = "auxiliary";

// -
// Write tuning

/// Default periodic-sync threshold for files staged through `write_sst`.
pub(crate) const DEFAULT_BYTES_PER_SYNC: usize = 512 << 10; // 512 KiB

/// Default aggregate admission rate for bulk staging writes.
pub(crate) const DEFAULT_WRITE_RATE_BYTES_PER_SEC: u64 = 32 << 20; // 32 MiB/s

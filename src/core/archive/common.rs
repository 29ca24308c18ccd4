// Archive reader trait shared by every supported format

use std::path::Path;
use crate::models::{ArchiveEntry, ArchiveFormat, ExtractError};

/// Trait for listing and selectively extracting archive entries
pub trait ArchiveReader: Send + Sync {
    /// Format this reader handles
    fn format(&self) -> ArchiveFormat;

    /// List every entry in the archive without extracting any content
    ///
    /// Fails with `ArchiveUnreadable` when the archive cannot be opened or
    /// the listing tool exits non-zero.
    fn list_entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>, ExtractError>;

    /// Extract exactly one entry to `destination`, creating parent directories
    ///
    /// `entry_name` is the full in-archive path as returned by `list_entries`.
    /// Fails with `EntryNotFound` when the archive has no such entry and with
    /// `ExtractionFailed` for any other I/O or subprocess failure.
    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_name: &str,
        destination: &Path,
    ) -> Result<(), ExtractError>;
}

// Archive readers and format dispatch
pub mod common;
pub mod rar_reader;
pub mod tool;
pub mod zip_reader;

#[path = "7z_reader.rs"]
pub mod sevenz_reader;

use std::path::Path;
use std::sync::Arc;
use crate::models::{ArchiveFormat, ExtractError};
use common::ArchiveReader;
use rar_reader::RarReader;
use sevenz_reader::SevenZipReader;
use tool::ToolLocator;
use zip_reader::ZipReader;

/// Maps archive paths to formats and formats to readers
///
/// The format is decided from the extension alone; the reader is built
/// once per run and kept for its duration.
pub struct ArchiveTypeResolver {
    tools: Arc<ToolLocator>,
}

impl ArchiveTypeResolver {
    pub fn new(tools: Arc<ToolLocator>) -> Self {
        Self { tools }
    }

    /// Determine the archive format from the file extension (case-insensitive)
    ///
    /// # Returns
    /// * `UnsupportedFormat` for anything other than .zip, .rar and .7z
    pub fn resolve(archive_path: &Path) -> Result<ArchiveFormat, ExtractError> {
        let ext = archive_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext {
            Some(ext) => ArchiveFormat::ALL
                .into_iter()
                .find(|format| format.extension() == ext)
                .ok_or_else(|| ExtractError::UnsupportedFormat(format!(".{}", ext))),
            None => Err(ExtractError::UnsupportedFormat(format!(
                "{} has no file extension",
                archive_path.display()
            ))),
        }
    }

    /// Build the reader for a format
    pub fn reader_for(&self, format: ArchiveFormat) -> Box<dyn ArchiveReader> {
        match format {
            ArchiveFormat::Zip => Box::new(ZipReader::new()),
            ArchiveFormat::Rar => Box::new(RarReader::new(Arc::clone(&self.tools))),
            ArchiveFormat::SevenZip => Box::new(SevenZipReader::new(Arc::clone(&self.tools))),
        }
    }

    /// Resolve the format of `archive_path` and build its reader
    pub fn reader_for_path(&self, archive_path: &Path) -> Result<Box<dyn ArchiveReader>, ExtractError> {
        let format = Self::resolve(archive_path)?;
        Ok(self.reader_for(format))
    }

    /// Check if a file has a supported archive extension
    pub fn is_supported(path: &Path) -> bool {
        Self::resolve(path).is_ok()
    }

    /// Get list of supported archive extensions
    pub fn supported_extensions() -> Vec<&'static str> {
        ArchiveFormat::ALL.iter().map(ArchiveFormat::extension).collect()
    }
}

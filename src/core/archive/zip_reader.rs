use std::path::Path;
use std::fs::{self, File};
use std::io;
use zip::ZipArchive;
use zip::result::ZipError;
use crate::core::archive::common::ArchiveReader;
use crate::core::file_ops::paths::ensure_parent_dir;
use crate::models::{ArchiveEntry, ArchiveFormat, ExtractError};

/// ZIP archive reader
///
/// Reads the central directory in-process; no external tool and no
/// temporary files are involved.
pub struct ZipReader;

impl ZipReader {
    pub fn new() -> Self {
        Self
    }

    fn open(archive_path: &Path) -> Result<ZipArchive<File>, ExtractError> {
        let file = File::open(archive_path)
            .map_err(|e| ExtractError::ArchiveUnreadable(
                format!("Failed to open ZIP archive {}: {}", archive_path.display(), e)
            ))?;

        ZipArchive::new(file)
            .map_err(|e| ExtractError::ArchiveUnreadable(
                format!("Failed to read ZIP archive {}: {}", archive_path.display(), e)
            ))
    }
}

impl ArchiveReader for ZipReader {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    /// List ZIP entries from central directory metadata
    ///
    /// Uses raw entry access, so nothing is decompressed.
    fn list_entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>, ExtractError> {
        let mut archive = Self::open(archive_path)?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)
                .map_err(|e| ExtractError::ArchiveUnreadable(
                    format!("Failed to read entry at index {}: {}", i, e)
                ))?;

            let entry = if file.is_dir() {
                ArchiveEntry::directory(file.name())
            } else {
                ArchiveEntry::new(file.name(), file.size())
            };
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Extract one ZIP entry by exact name
    ///
    /// # Behavior
    /// - Streams the decompressed entry straight into the destination file
    /// - Both streams are closed before returning, on success and on error
    /// - CRC mismatches surface as `ExtractionFailed`
    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_name: &str,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        let mut archive = Self::open(archive_path)
            .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?;

        let mut file = match archive.by_name(entry_name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(ExtractError::EntryNotFound(entry_name.to_string()));
            }
            Err(e) => {
                return Err(ExtractError::ExtractionFailed(
                    format!("Failed to read entry {}: {}", entry_name, e)
                ));
            }
        };

        ensure_parent_dir(destination)?;

        let mut output_file = File::create(destination)
            .map_err(|e| ExtractError::ExtractionFailed(
                format!("Failed to create output file {}: {}", destination.display(), e)
            ))?;

        if let Err(e) = io::copy(&mut file, &mut output_file) {
            drop(output_file);
            // Do not leave a truncated file behind to be skipped next run
            let _ = fs::remove_file(destination);
            return Err(ExtractError::ExtractionFailed(
                format!("Failed to extract {}: {}", entry_name, e)
            ));
        }

        Ok(())
    }
}

impl Default for ZipReader {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::write_zip;
    use tempfile::TempDir;

    #[test]
    fn test_list_entries() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("test.zip");
        write_zip(&zip_path, &[
            ("docs/", "".as_bytes()),
            ("docs/a.pdf", "%PDF-a".as_bytes()),
            ("notes.txt", "hello".as_bytes()),
        ]);

        let entries = ZipReader::new().list_entries(&zip_path).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_dir);
        assert_eq!(entries[0].size, Some(0));
        assert_eq!(entries[1], ArchiveEntry::new("docs/a.pdf", 6));
        assert_eq!(entries[2], ArchiveEntry::new("notes.txt", 5));
    }

    #[test]
    fn test_extract_entry_round_trip() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("test.zip");
        let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i * 31 % 251) as u8).collect();
        write_zip(&zip_path, &[("deep/nested/report.pdf", payload.as_slice())]);

        let destination = temp.path().join("out").join("deep").join("nested").join("report.pdf");
        ZipReader::new()
            .extract_entry(&zip_path, "deep/nested/report.pdf", &destination)
            .unwrap();

        let extracted = fs::read(&destination).unwrap();
        assert_eq!(crc32fast::hash(&extracted), crc32fast::hash(&payload));
        assert_eq!(extracted.len(), payload.len());
    }

    #[test]
    fn test_extract_requires_exact_name() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("test.zip");
        write_zip(&zip_path, &[("docs/a.pdf", "%PDF".as_bytes())]);

        let result = ZipReader::new().extract_entry(&zip_path, "a.pdf", &temp.path().join("a.pdf"));
        assert!(matches!(result, Err(ExtractError::EntryNotFound(_))));
        assert!(!temp.path().join("a.pdf").exists());
    }

    #[test]
    fn test_list_nonexistent_archive() {
        let result = ZipReader::new().list_entries(Path::new("/nonexistent.zip"));
        assert!(matches!(result, Err(ExtractError::ArchiveUnreadable(_))));
    }

    #[test]
    fn test_list_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("corrupt.zip");
        fs::write(&zip_path, b"this is not a zip file at all").unwrap();

        let result = ZipReader::new().list_entries(&zip_path);
        assert!(matches!(result, Err(ExtractError::ArchiveUnreadable(_))));
    }
}

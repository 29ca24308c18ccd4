use tempfile::TempDir;
use std::path::{Path, PathBuf};
use std::fs;
use crate::core::file_ops::paths::move_file;
use crate::models::ExtractError;

/// Scratch directory for a single tool-driven extraction
///
/// External tools write the extracted entry here under its base name; the
/// file is then moved to its final destination. Created next to the
/// destination so the move stays on one filesystem, and removed when
/// dropped, on success and on error alike.
pub struct TempWorkspace {
    temp_dir: TempDir,
}

impl TempWorkspace {
    /// Create a new uniquely named workspace inside `parent`
    ///
    /// # Arguments
    /// * `parent` - Directory to create the workspace in (created if missing)
    /// * `label` - Name fragment used in the directory prefix
    pub fn new_in(parent: &Path, label: &str) -> Result<Self, ExtractError> {
        fs::create_dir_all(parent)
            .map_err(|e| ExtractError::ExtractionFailed(
                format!("Failed to create directory {}: {}", parent.display(), e)
            ))?;

        let temp_dir = tempfile::Builder::new()
            .prefix(&format!(".pdfsift_{}_", label))
            .tempdir_in(parent)
            .map_err(|e| ExtractError::ExtractionFailed(
                format!("Failed to create temporary directory: {}", e)
            ))?;

        Ok(Self { temp_dir })
    }

    /// Get the workspace directory path
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path a tool would produce for `file_name` inside the workspace
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.temp_dir.path().join(file_name)
    }

    /// Move a produced file out of the workspace
    ///
    /// # Arguments
    /// * `file_name` - Base name the tool wrote
    /// * `entry_name` - Full in-archive name, for the error message
    /// * `destination` - Final path
    ///
    /// # Returns
    /// * `EntryNotFound` when the tool produced nothing under that name
    pub fn take_file(&self, file_name: &str, entry_name: &str, destination: &Path) -> Result<(), ExtractError> {
        let produced = self.file_path(file_name);
        if !produced.is_file() {
            return Err(ExtractError::EntryNotFound(entry_name.to_string()));
        }
        move_file(&produced, destination)
    }
}

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::archive::common::ArchiveReader;
use crate::core::archive::tool::ToolLocator;
use crate::core::archive::ArchiveTypeResolver;
use crate::core::file_ops::paths::{display_relative, relative_destination};
use crate::core::filter::EntryFilter;
use crate::models::{ArchiveEntry, ExtractError, ExtractOptions, ExtractionOutcome, ExtractionResult};
use crate::utils::progress::{ExtractionProgress, SilentProgress};

/// Extraction engine that orchestrates one run
///
/// Workflow:
/// 1. Resolve the archive format from its extension
/// 2. Make sure the output directory exists
/// 3. List every entry and keep those the filter accepts
/// 4. Extract matches one at a time, in listing order
/// 5. Return the aggregated `ExtractionResult`
///
/// Steps 1-3 abort the run on failure. Failures in step 4 are recorded
/// per entry and the loop moves on.
pub struct ExtractionEngine {
    resolver: ArchiveTypeResolver,
    progress: Box<dyn ExtractionProgress>,
}

impl ExtractionEngine {
    pub fn new(tools: Arc<ToolLocator>) -> Self {
        Self {
            resolver: ArchiveTypeResolver::new(tools),
            progress: Box::new(SilentProgress),
        }
    }

    /// Report progress to `progress` instead of discarding it
    pub fn with_progress(mut self, progress: Box<dyn ExtractionProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// List the entries of `archive_path` that `filter` accepts, without extracting
    pub fn scan(&self, archive_path: &Path, filter: &dyn EntryFilter) -> Result<Vec<ArchiveEntry>, ExtractError> {
        let reader = self.resolver.reader_for_path(archive_path)?;
        let entries = reader.list_entries(archive_path)?;
        Ok(entries.into_iter().filter(|e| filter.matches(e)).collect())
    }

    /// Extract every matching entry of `archive_path` into `output_dir`
    ///
    /// # Arguments
    /// * `archive_path` - Archive to read (.zip, .rar or .7z)
    /// * `output_dir` - Destination root, created if missing
    /// * `options` - Structure and overwrite policy
    /// * `filter` - Which entries to extract
    ///
    /// # Returns
    /// * The populated result, or the fatal error that stopped the run
    pub fn run(
        &self,
        archive_path: &Path,
        output_dir: &Path,
        options: ExtractOptions,
        filter: &dyn EntryFilter,
    ) -> Result<ExtractionResult, ExtractError> {
        let reader = self.resolver.reader_for_path(archive_path)?;
        self.run_with_reader(reader.as_ref(), archive_path, output_dir, options, filter)
    }

    pub(crate) fn run_with_reader(
        &self,
        reader: &dyn ArchiveReader,
        archive_path: &Path,
        output_dir: &Path,
        options: ExtractOptions,
        filter: &dyn EntryFilter,
    ) -> Result<ExtractionResult, ExtractError> {
        info!(
            archive = %archive_path.display(),
            format = %reader.format(),
            output = %output_dir.display(),
            "starting extraction"
        );

        fs::create_dir_all(output_dir)
            .map_err(|e| ExtractError::DirectoryCreateFailed(
                format!("{}: {}", output_dir.display(), e)
            ))?;

        let archive_size = fs::metadata(archive_path)
            .map_err(|e| ExtractError::ArchiveUnreadable(
                format!("{}: {}", archive_path.display(), e)
            ))?
            .len();

        let entries = reader.list_entries(archive_path)?;
        let mut result = ExtractionResult::new(archive_size);
        result.total_entries = entries.len();

        let matches: Vec<ArchiveEntry> = entries.into_iter().filter(|e| filter.matches(e)).collect();
        result.pdf_files_found = matches.len();

        debug!(total = result.total_entries, found = matches.len(), filter = filter.label(), "listed archive");
        self.progress.on_start(archive_path, matches.len());

        let mut written: HashSet<PathBuf> = HashSet::new();
        for entry in &matches {
            let (relative, outcome, size) =
                self.extract_one(reader, archive_path, output_dir, options, entry, &mut written);
            self.progress.on_entry(&relative, &outcome);
            result.record(&relative, &outcome, size);
        }

        info!(
            extracted = result.pdf_files_extracted,
            skipped = result.skipped_existing,
            errors = result.errors_occurred,
            "extraction finished"
        );
        self.progress.on_finish(&result);

        Ok(result)
    }

    /// Handle one matching entry; never fails, the outcome carries the error
    ///
    /// `written` holds the destinations produced earlier in this run. Only
    /// files that were there before the run count as existing, so flattened
    /// entries sharing a base name overwrite each other.
    fn extract_one(
        &self,
        reader: &dyn ArchiveReader,
        archive_path: &Path,
        output_dir: &Path,
        options: ExtractOptions,
        entry: &ArchiveEntry,
        written: &mut HashSet<PathBuf>,
    ) -> (String, ExtractionOutcome, u64) {
        let relative = match relative_destination(entry, options.preserve_structure) {
            Ok(relative) => relative,
            Err(e) => {
                warn!(entry = %entry.name, error = %e, "skipping unsafe entry");
                return (entry.name.clone(), ExtractionOutcome::Failed(e.to_string()), 0);
            }
        };
        let shown = display_relative(&relative);
        let destination = output_dir.join(&relative);

        if !options.overwrite && !written.contains(&destination) && destination.exists() {
            debug!(path = %shown, "destination exists, skipping");
            return (shown, ExtractionOutcome::SkippedExisting, 0);
        }

        match reader.extract_entry(archive_path, &entry.name, &destination) {
            Ok(()) => {
                let size = fs::metadata(&destination).map(|m| m.len()).unwrap_or(0);
                debug!(path = %shown, size, "extracted");
                written.insert(destination);
                (shown, ExtractionOutcome::Extracted, size)
            }
            Err(e) => {
                warn!(entry = %entry.name, error = %e, "extraction failed");
                (shown, ExtractionOutcome::Failed(e.to_string()), 0)
            }
        }
    }
}

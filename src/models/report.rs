use serde::Serialize;

/// Outcome of one attempted entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum ExtractionOutcome {
    Extracted,
    SkippedExisting,
    Failed(String),
}

/// Aggregate result of one extraction run
///
/// Built empty by the engine, filled in entry by entry and handed to the
/// caller once the run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Every entry the archive listed, matching or not
    pub total_entries: usize,
    /// Entries accepted by the filter
    pub pdf_files_found: usize,
    pub pdf_files_extracted: usize,
    pub skipped_existing: usize,
    pub errors_occurred: usize,
    /// Size of the archive file itself
    pub total_archive_size: u64,
    /// Sum of on-disk sizes of the files written this run
    pub extracted_pdf_size: u64,
    /// Relative output paths, in listing order
    pub extracted_files: Vec<String>,
    pub skipped_files: Vec<String>,
    pub error_messages: Vec<String>,
}

impl ExtractionResult {
    pub fn new(total_archive_size: u64) -> Self {
        Self {
            total_archive_size,
            ..Default::default()
        }
    }

    /// Fold one entry outcome into the counters
    pub fn record(&mut self, relative_path: &str, outcome: &ExtractionOutcome, extracted_size: u64) {
        match outcome {
            ExtractionOutcome::Extracted => {
                self.pdf_files_extracted += 1;
                self.extracted_pdf_size += extracted_size;
                self.extracted_files.push(relative_path.to_string());
            }
            ExtractionOutcome::SkippedExisting => {
                self.skipped_existing += 1;
                self.skipped_files.push(relative_path.to_string());
            }
            ExtractionOutcome::Failed(reason) => {
                self.errors_occurred += 1;
                self.error_messages.push(format!("{}: {}", relative_path, reason));
            }
        }
    }

    /// `extracted + skipped + errors == found`
    pub fn is_consistent(&self) -> bool {
        self.pdf_files_extracted + self.skipped_existing + self.errors_occurred
            == self.pdf_files_found
    }

    pub fn has_errors(&self) -> bool {
        self.errors_occurred > 0
    }
}

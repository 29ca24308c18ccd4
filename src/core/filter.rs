use crate::models::ArchiveEntry;

/// Predicate selecting which listed entries get extracted
pub trait EntryFilter: Send + Sync {
    fn matches(&self, entry: &ArchiveEntry) -> bool;

    /// Short label used in logs and reports, e.g. "PDF"
    fn label(&self) -> &str;
}

/// Selects PDF documents
///
/// An entry matches when its name ends in `.pdf` (any case) and it has
/// content. Zero-length entries are treated as placeholders or directory
/// markers, not files; an entry whose size the listing did not report is
/// kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfFilter;

impl PdfFilter {
    pub fn new() -> Self {
        Self
    }
}

impl EntryFilter for PdfFilter {
    fn matches(&self, entry: &ArchiveEntry) -> bool {
        !entry.is_dir
            && entry.size != Some(0)
            && entry.name.to_ascii_lowercase().ends_with(".pdf")
    }

    fn label(&self) -> &str {
        "PDF"
    }
}

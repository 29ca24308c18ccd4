use std::time::Duration;
use thiserror::Error;

/// Custom error types for pdfsift
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("{0} not found; install it or configure its path")]
    ToolNotFound(String),

    #[error("{tool} did not finish within {timeout:?}")]
    ToolTimedOut { tool: String, timeout: Duration },

    #[error("Cannot read archive: {0}")]
    ArchiveUnreadable(String),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreateFailed(String),

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable tag for each error variant, for callers that only need the kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    ToolNotFound,
    ToolTimedOut,
    ArchiveUnreadable,
    DirectoryCreateFailed,
    EntryNotFound,
    ExtractionFailed,
    InvalidConfig,
    Io,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ExtractError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            ExtractError::ToolTimedOut { .. } => ErrorKind::ToolTimedOut,
            ExtractError::ArchiveUnreadable(_) => ErrorKind::ArchiveUnreadable,
            ExtractError::DirectoryCreateFailed(_) => ErrorKind::DirectoryCreateFailed,
            ExtractError::EntryNotFound(_) => ErrorKind::EntryNotFound,
            ExtractError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            ExtractError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ExtractError::Io(_) => ErrorKind::Io,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::ToolNotFound => "ToolNotFound",
            ErrorKind::ToolTimedOut => "ToolTimedOut",
            ErrorKind::ArchiveUnreadable => "ArchiveUnreadable",
            ErrorKind::DirectoryCreateFailed => "DirectoryCreateFailed",
            ErrorKind::EntryNotFound => "EntryNotFound",
            ErrorKind::ExtractionFailed => "ExtractionFailed",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::Io => "Io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<config::ConfigError> for ExtractError {
    fn from(err: config::ConfigError) -> Self {
        ExtractError::InvalidConfig(err.to_string())
    }
}

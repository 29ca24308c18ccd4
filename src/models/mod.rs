pub mod config;
pub mod entry;
pub mod error;
pub mod report;

// Re-export commonly used types
pub use config::{ExtractOptions, PdfsiftConfig};
pub use entry::{ArchiveEntry, ArchiveFormat};
pub use error::{ErrorKind, ExtractError};
pub use report::{ExtractionOutcome, ExtractionResult};

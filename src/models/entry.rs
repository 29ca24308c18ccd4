use serde::Serialize;
use std::fmt;

/// Archive container formats pdfsift can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArchiveFormat {
    Zip,
    Rar,
    SevenZip,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 3] = [ArchiveFormat::Zip, ArchiveFormat::Rar, ArchiveFormat::SevenZip];

    /// Lowercase file extension for this format, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Rar => "rar",
            ArchiveFormat::SevenZip => "7z",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveFormat::Zip => "ZIP",
            ArchiveFormat::Rar => "RAR",
            ArchiveFormat::SevenZip => "7z",
        };
        f.write_str(name)
    }
}

/// Represents one entry listed from an archive
///
/// Snapshot taken at listing time. The full in-archive path is the locator
/// every reader accepts when asked to extract the entry again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    /// Full path inside the archive, `/`-separated as stored
    pub name: String,
    /// Uncompressed size in bytes, `None` when the listing did not say
    pub size: Option<u64>,
    pub is_dir: bool,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
            is_dir: false,
        }
    }

    pub fn with_unknown_size(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            is_dir: false,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: Some(0),
            is_dir: true,
        }
    }

    /// Last path component of the entry name
    ///
    /// Archives written on Windows may use `\` separators, so both are honoured.
    pub fn base_name(&self) -> &str {
        base_name_of(&self.name)
    }
}

/// Last component of an in-archive name, accepting `/` and `\` separators
pub fn base_name_of(name: &str) -> &str {
    let trimmed = name.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
}

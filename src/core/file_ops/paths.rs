use std::fs;
use std::path::{Component, Path, PathBuf};
use crate::models::{ArchiveEntry, ExtractError};

/// Turn an in-archive name into a safe relative path
///
/// Backslashes are treated as separators and `.` components dropped.
/// Absolute names, drive prefixes and `..` components are rejected so no
/// entry can land outside the output directory (zip-slip).
pub fn sanitize_entry_path(name: &str) -> Result<PathBuf, ExtractError> {
    let normalized = name.replace('\\', "/");

    if normalized.starts_with('/') {
        return Err(ExtractError::ExtractionFailed(format!(
            "Refusing absolute entry path: {}",
            name
        )));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => {
                // `C:` style prefixes are plain components on Unix
                if part.to_string_lossy().contains(':') {
                    return Err(ExtractError::ExtractionFailed(format!(
                        "Refusing entry path with drive prefix: {}",
                        name
                    )));
                }
                relative.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::ExtractionFailed(format!(
                    "Refusing entry path outside the output directory: {}",
                    name
                )));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(ExtractError::ExtractionFailed(format!(
            "Entry has an empty path: {:?}",
            name
        )));
    }

    Ok(relative)
}

/// Destination of an entry relative to the output directory
///
/// The full in-archive path when `preserve_structure` is set, the base name
/// otherwise (entries sharing a base name then overwrite each other).
pub fn relative_destination(
    entry: &ArchiveEntry,
    preserve_structure: bool,
) -> Result<PathBuf, ExtractError> {
    if preserve_structure {
        sanitize_entry_path(&entry.name)
    } else {
        sanitize_entry_path(entry.base_name())
    }
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent_dir(path: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                ExtractError::ExtractionFailed(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

/// Move a file into place, replacing any existing destination
///
/// Falls back to copy-and-delete when a rename crosses filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<(), ExtractError> {
    ensure_parent_dir(to)?;

    if to.is_file() {
        fs::remove_file(to).map_err(|e| {
            ExtractError::ExtractionFailed(format!("Failed to replace {}: {}", to.display(), e))
        })?;
    }

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(|e| {
        ExtractError::ExtractionFailed(format!(
            "Failed to move {} to {}: {}",
            from.display(),
            to.display(),
            e
        ))
    })?;
    fs::remove_file(from).map_err(|e| {
        ExtractError::ExtractionFailed(format!("Failed to remove {}: {}", from.display(), e))
    })?;

    Ok(())
}

/// Render a relative path with `/` separators for reports
pub fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

use std::ffi::OsString;
use std::path::{Path, MAIN_SEPARATOR};
use std::sync::Arc;
use tracing::debug;
use crate::core::archive::common::ArchiveReader;
use crate::core::archive::tool::{run_tool, Tool, ToolLocator, ToolStage};
use crate::core::file_ops::paths::{ensure_parent_dir, move_file};
use crate::models::entry::base_name_of;
use crate::models::{ArchiveEntry, ArchiveFormat, ExtractError};

/// Minimum number of dashes in a line delimiting the listing table
const SEPARATOR_MIN_DASHES: usize = 15;

/// unrar exit code for "no files to extract"
const RAR_EXIT_NO_FILES: i32 = 10;

/// RAR archive reader
///
/// There is no in-process RAR decoder; listing and extraction shell out to
/// the located WinRAR/unrar executable.
pub struct RarReader {
    tools: Arc<ToolLocator>,
}

impl RarReader {
    pub fn new(tools: Arc<ToolLocator>) -> Self {
        Self { tools }
    }
}

impl ArchiveReader for RarReader {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Rar
    }

    /// List entries with `l -cfg-`
    ///
    /// `-cfg-` ignores the user's RAR configuration and environment so the
    /// table layout stays predictable.
    fn list_entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>, ExtractError> {
        let program = self.tools.require(Tool::WinRar)?;
        let args: Vec<OsString> = vec![
            "l".into(),
            "-cfg-".into(),
            archive_path.as_os_str().to_owned(),
        ];

        let output = run_tool(Tool::WinRar, program, &args, self.tools.timeout(), ToolStage::Listing)?;
        if !output.success() {
            return Err(ExtractError::ArchiveUnreadable(format!(
                "Listing {} failed: {}",
                archive_path.display(),
                output.diagnostic()
            )));
        }

        Ok(parse_listing(&output.stdout))
    }

    /// Extract one entry with `e -cfg- -o+`
    ///
    /// # Behavior
    /// - `e` drops the stored folders, so the file lands under its base name
    ///   in the destination's directory
    /// - The produced file is renamed when the destination name differs
    /// - unrar's "no files to extract" exit status means `EntryNotFound`
    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_name: &str,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        let program = self.tools.require(Tool::WinRar)?;

        ensure_parent_dir(destination)?;
        let output_dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // unrar only treats the last argument as a destination when it ends with a separator
        let mut target = output_dir.as_os_str().to_owned();
        target.push(MAIN_SEPARATOR.to_string());

        let args: Vec<OsString> = vec![
            "e".into(),
            "-cfg-".into(),
            "-o+".into(),
            archive_path.as_os_str().to_owned(),
            entry_name.into(),
            target,
        ];

        let output = run_tool(Tool::WinRar, program, &args, self.tools.timeout(), ToolStage::Extracting)?;
        if output.code() == Some(RAR_EXIT_NO_FILES) {
            return Err(ExtractError::EntryNotFound(entry_name.to_string()));
        }
        if !output.success() {
            return Err(ExtractError::ExtractionFailed(format!(
                "Extracting {} failed: {}",
                entry_name,
                output.diagnostic()
            )));
        }

        let produced = output_dir.join(base_name_of(entry_name));
        if !produced.is_file() {
            return Err(ExtractError::EntryNotFound(entry_name.to_string()));
        }
        if produced != destination {
            debug!(from = %produced.display(), to = %destination.display(), "renaming extracted file");
            move_file(&produced, destination)?;
        }

        Ok(())
    }
}

/// A table delimiter: only dashes and spaces, with enough dashes
fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| c == '-' || c == ' ')
        && trimmed.chars().filter(|&c| c == '-').count() >= SEPARATOR_MIN_DASHES
}

/// Parse the output of `unrar l`
///
/// The file table sits between the first and second separator line. Rows
/// read `attributes size date time name`; the name is the rest of the line
/// so embedded spaces survive.
pub fn parse_listing(stdout: &str) -> Vec<ArchiveEntry> {
    let mut entries = Vec::new();
    let mut in_table = false;

    for line in stdout.lines() {
        if is_separator(line) {
            if in_table {
                break;
            }
            in_table = true;
            continue;
        }

        if !in_table || line.trim().is_empty() {
            continue;
        }

        match parse_row(line) {
            Some(entry) => entries.push(entry),
            None => debug!(line, "skipping unrecognised RAR listing row"),
        }
    }

    entries
}

fn parse_row(line: &str) -> Option<ArchiveEntry> {
    let trimmed = line.trim();

    if let Some((fields, name)) = split_fields(trimmed, 4) {
        if let Ok(size) = fields[1].parse::<u64>() {
            let name = name.trim_end();
            if name.is_empty() {
                return None;
            }
            let attributes = fields[0];
            if attributes.starts_with('d') || attributes.contains('D') {
                return Some(ArchiveEntry::directory(name));
            }
            return Some(ArchiveEntry::new(name, size));
        }
    }

    // Layout we do not know: fall back to the trailing token of a PDF row
    if !trimmed.to_ascii_lowercase().ends_with(".pdf") {
        return None;
    }
    let mut tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let name = tokens.pop()?;
    match tokens.iter().find_map(|t| t.parse::<u64>().ok()) {
        Some(size) => Some(ArchiveEntry::new(name, size)),
        None => Some(ArchiveEntry::with_unknown_size(name)),
    }
}

/// Split off `count` whitespace-separated fields, returning them and the remainder
fn split_fields(line: &str, count: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(count);
    let mut rest = line;

    for _ in 0..count {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = &rest[end..];
    }

    Some((fields, rest.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const UNRAR_OUTPUT: &str = "
UNRAR 6.24 freeware      Copyright (c) 1993-2023 Alexander Roshal

Archive: docs.rar
Details: RAR 5

 Attributes      Size     Date    Time   Name
----------- ---------  ---------- -----  ----
 drwxr-xr-x         0  2024-03-01 09:12  docs
 -rw-r--r--      4096  2024-03-01 09:12  docs/annual report.pdf
 -rw-r--r--       512  2024-03-01 09:12  docs/readme.txt
    ..A....     20480  2024-03-02 10:00  scans\\B.PDF
 -rw-r--r--         0  2024-03-01 09:12  empty.pdf
----------- ---------  ---------- -----  ----
                25088                    5
";

    #[test]
    fn test_parse_listing() {
        let entries = parse_listing(UNRAR_OUTPUT);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0], ArchiveEntry::directory("docs"));
        assert_eq!(entries[1], ArchiveEntry::new("docs/annual report.pdf", 4096));
        assert_eq!(entries[2], ArchiveEntry::new("docs/readme.txt", 512));
        assert_eq!(entries[3], ArchiveEntry::new("scans\\B.PDF", 20480));
        assert_eq!(entries[4], ArchiveEntry::new("empty.pdf", 0));
    }

    #[test]
    fn test_parse_listing_with_long_rule() {
        let output = "\
Archive docs.rar
-------------------------------------------------------------------------------
 -rw-r--r--  1200  2019-05-05 11:11  a.pdf
-------------------------------------------------------------------------------
 -rw-r--r--  9999  2019-05-05 11:11  after.pdf
";
        let entries = parse_listing(output);
        assert_eq!(entries, vec![ArchiveEntry::new("a.pdf", 1200)]);
    }

    #[test]
    fn test_short_dash_runs_are_not_separators() {
        assert!(!is_separator("----------"));
        assert!(is_separator("---------------"));
        assert!(is_separator("----------- ---------  ---------- -----  ----"));
        assert!(!is_separator("-- a.pdf ---------------"));
    }

    #[test]
    fn test_parse_without_table() {
        assert!(parse_listing("No archives found\n").is_empty());
    }

    #[test]
    fn test_fallback_row_uses_trailing_token() {
        let entry = parse_row("report  1,024 KB  old.pdf").unwrap();
        assert_eq!(entry.name, "old.pdf");
        assert_eq!(entry.size, None);
        assert_eq!(parse_row("x 2048 old.pdf"), Some(ArchiveEntry::new("old.pdf", 2048)));
        assert!(parse_row("some junk without a name").is_none());
    }

    #[test]
    fn test_missing_tool_is_reported_lazily() {
        let reader = RarReader::new(Arc::new(ToolLocator::with_candidates(vec![], vec![])));
        let result = reader.list_entries(Path::new("/tmp/any.rar"));
        assert!(matches!(result, Err(ExtractError::ToolNotFound(_))));

        let result = reader.extract_entry(Path::new("/tmp/any.rar"), "a.pdf", &PathBuf::from("/tmp/a.pdf"));
        assert!(matches!(result, Err(ExtractError::ToolNotFound(_))));
    }

    #[cfg(unix)]
    mod with_fake_tool {
        use super::*;
        use crate::core::archive::tool::test_support::{fake_tool, lock};
        use std::fs;
        use tempfile::TempDir;

        // Mimics `unrar l` and `unrar e -cfg- -o+ <archive> <entry> <dir>/`
        const FAKE_UNRAR: &str = r#"
case "$1" in
  l)
    if [ ! -f "$3" ]; then echo "Cannot open $3" >&2; exit 3; fi
    echo "----------- ---------  ---------- -----  ----"
    echo " -rw-r--r--      7  2024-01-01 00:00  docs/a.pdf"
    echo "----------- ---------  ---------- -----  ----"
    ;;
  e)
    if [ "$5" != "docs/a.pdf" ]; then echo "No files to extract"; exit 10; fi
    printf '%%PDF-1' > "$6a.pdf"
    ;;
esac
"#;

        fn reader_with_fake(dir: &Path) -> RarReader {
            let unrar = fake_tool(dir, "unrar", FAKE_UNRAR);
            RarReader::new(Arc::new(ToolLocator::with_candidates(vec![unrar], vec![])))
        }

        #[test]
        fn test_list_and_extract() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());
            let archive = temp.path().join("docs.rar");
            fs::write(&archive, b"Rar!").unwrap();

            let entries = reader.list_entries(&archive).unwrap();
            assert_eq!(entries, vec![ArchiveEntry::new("docs/a.pdf", 7)]);

            let destination = temp.path().join("out").join("docs").join("a.pdf");
            reader.extract_entry(&archive, "docs/a.pdf", &destination).unwrap();
            assert_eq!(fs::read(&destination).unwrap(), b"%PDF-1");
        }

        #[test]
        fn test_extract_renames_to_requested_destination() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());
            let archive = temp.path().join("docs.rar");
            fs::write(&archive, b"Rar!").unwrap();

            let destination = temp.path().join("out").join("renamed.pdf");
            reader.extract_entry(&archive, "docs/a.pdf", &destination).unwrap();

            assert!(destination.is_file());
            assert!(!temp.path().join("out").join("a.pdf").exists());
        }

        #[test]
        fn test_extract_unknown_entry() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());
            let archive = temp.path().join("docs.rar");
            fs::write(&archive, b"Rar!").unwrap();

            let result = reader.extract_entry(&archive, "nope.pdf", &temp.path().join("nope.pdf"));
            assert!(matches!(result, Err(ExtractError::EntryNotFound(_))));
        }

        #[test]
        fn test_listing_failure_is_archive_unreadable() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());

            let result = reader.list_entries(&temp.path().join("missing.rar"));
            match result {
                Err(ExtractError::ArchiveUnreadable(msg)) => assert!(msg.contains("exit code 3")),
                other => panic!("Expected ArchiveUnreadable, got {:?}", other),
            }
        }
    }
}

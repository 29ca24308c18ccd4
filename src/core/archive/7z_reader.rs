use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use crate::core::archive::common::ArchiveReader;
use crate::core::archive::tool::{run_tool, Tool, ToolLocator, ToolStage};
use crate::core::file_ops::temp_manager::TempWorkspace;
use crate::models::entry::base_name_of;
use crate::models::{ArchiveEntry, ArchiveFormat, ExtractError};

/// 7z archive reader
///
/// Shells out to the located 7-Zip executable for both listing and
/// extraction.
pub struct SevenZipReader {
    tools: Arc<ToolLocator>,
}

impl SevenZipReader {
    pub fn new(tools: Arc<ToolLocator>) -> Self {
        Self { tools }
    }
}

impl ArchiveReader for SevenZipReader {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::SevenZip
    }

    /// List entries with `l -slt` (one `key = value` block per entry)
    fn list_entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>, ExtractError> {
        let program = self.tools.require(Tool::SevenZip)?;
        let args: Vec<OsString> = vec![
            "l".into(),
            "-slt".into(),
            archive_path.as_os_str().to_owned(),
        ];

        let output = run_tool(Tool::SevenZip, program, &args, self.tools.timeout(), ToolStage::Listing)?;
        if !output.success() {
            return Err(ExtractError::ArchiveUnreadable(format!(
                "Listing {} failed: {}",
                archive_path.display(),
                output.diagnostic()
            )));
        }

        Ok(parse_listing(&output.stdout))
    }

    /// Extract one entry with `e` into a scratch directory, then move it
    ///
    /// # Behavior
    /// - `e` flattens paths, so the file appears under its base name
    /// - The scratch directory is removed on every exit path
    /// - A clean exit without the expected file means `EntryNotFound`
    fn extract_entry(
        &self,
        archive_path: &Path,
        entry_name: &str,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        let program = self.tools.require(Tool::SevenZip)?;

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let workspace = TempWorkspace::new_in(parent, "7z")?;

        let mut output_switch = OsString::from("-o");
        output_switch.push(workspace.path().as_os_str());

        let args: Vec<OsString> = vec![
            "e".into(),
            "-y".into(),
            "-bd".into(),
            output_switch,
            "--".into(),
            archive_path.as_os_str().to_owned(),
            entry_name.into(),
        ];

        let output = run_tool(Tool::SevenZip, program, &args, self.tools.timeout(), ToolStage::Extracting)?;
        if !output.success() {
            return Err(ExtractError::ExtractionFailed(format!(
                "Extracting {} failed: {}",
                entry_name,
                output.diagnostic()
            )));
        }

        workspace.take_file(base_name_of(entry_name), entry_name, destination)
    }
}

#[derive(Default)]
struct PendingEntry<'a> {
    path: &'a str,
    folder: Option<bool>,
    size: Option<u64>,
}

impl PendingEntry<'_> {
    /// Only blocks confirmed by `Folder = -` are files
    fn into_file(self) -> Option<ArchiveEntry> {
        match self.folder {
            Some(false) => Some(match self.size {
                Some(size) => ArchiveEntry::new(self.path, size),
                None => ArchiveEntry::with_unknown_size(self.path),
            }),
            _ => None,
        }
    }
}

/// Parse the output of `7z l -slt`
///
/// Each `Path = ...` line opens a candidate. It becomes a file entry once a
/// `Folder = -` line is seen for it; folders and the leading block that
/// describes the archive itself are dropped.
pub fn parse_listing(stdout: &str) -> Vec<ArchiveEntry> {
    let mut entries = Vec::new();
    let mut pending: Option<PendingEntry> = None;

    for line in stdout.lines() {
        let line = line.trim_end_matches('\r');

        if let Some(path) = line.strip_prefix("Path = ") {
            if let Some(entry) = pending.take().and_then(PendingEntry::into_file) {
                entries.push(entry);
            }
            pending = Some(PendingEntry {
                path,
                ..Default::default()
            });
            continue;
        }

        let Some(current) = pending.as_mut() else {
            continue;
        };

        if let Some(value) = line.strip_prefix("Folder = ") {
            current.folder = Some(value.trim() == "+");
        } else if let Some(value) = line.strip_prefix("Size = ") {
            current.size = value.trim().parse().ok();
        }
    }

    if let Some(entry) = pending.and_then(PendingEntry::into_file) {
        entries.push(entry);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLT_OUTPUT: &str = "
7-Zip 23.01 (x64) : Copyright (c) 1999-2023 Igor Pavlov : 2023-06-20

Scanning the drive for archives:
1 file, 30123 bytes (30 KiB)

Listing archive: bundle.7z

--
Path = bundle.7z
Type = 7z
Physical Size = 30123
Headers Size = 250
Method = LZMA2:24
Solid = +
Blocks = 1

----------
Path = docs
Size = 0
Packed Size = 0
Modified = 2024-03-01 09:12:00
Attributes = D
Folder = +

----------
Path = docs/a.pdf
Size = 20480
Packed Size = 29800
Modified = 2024-03-01 09:12:00
Attributes = A
CRC = 1A2B3C4D
Encrypted = -
Method = LZMA2:24
Block = 0
Folder = -

----------
Path = docs/notes with space.txt
Folder = -
Size = 77

----------
Path = empty.pdf
Size = 0
Folder = -
";

    #[test]
    fn test_parse_listing() {
        let entries = parse_listing(SLT_OUTPUT);
        assert_eq!(
            entries,
            vec![
                ArchiveEntry::new("docs/a.pdf", 20480),
                ArchiveEntry::new("docs/notes with space.txt", 77),
                ArchiveEntry::new("empty.pdf", 0),
            ]
        );
    }

    #[test]
    fn test_parse_listing_handles_crlf() {
        let output = "Path = a.pdf\r\nSize = 12\r\nFolder = -\r\n";
        assert_eq!(parse_listing(output), vec![ArchiveEntry::new("a.pdf", 12)]);
    }

    #[test]
    fn test_unconfirmed_candidate_is_dropped() {
        let output = "Path = archive.7z\nType = 7z\n\nPath = b.pdf\nSize = 3\n";
        assert!(parse_listing(output).is_empty());
    }

    #[test]
    fn test_missing_tool_is_reported_lazily() {
        let reader = SevenZipReader::new(Arc::new(ToolLocator::with_candidates(vec![], vec![])));
        let result = reader.list_entries(Path::new("/tmp/any.7z"));
        assert!(matches!(result, Err(ExtractError::ToolNotFound(_))));
    }

    #[cfg(unix)]
    mod with_fake_tool {
        use super::*;
        use crate::core::archive::tool::test_support::{fake_tool, lock};
        use std::fs;
        use tempfile::TempDir;

        // Mimics `7z l -slt <archive>` and `7z e -y -bd -o<dir> -- <archive> <entry>`
        const FAKE_7Z: &str = r#"
case "$1" in
  l)
    if [ ! -f "$3" ]; then echo "ERROR: $3 : cannot find archive" >&2; exit 2; fi
    echo "Path = $3"
    echo "Type = 7z"
    echo ""
    echo "----------"
    echo "Path = docs/a.pdf"
    echo "Size = 5"
    echo "Folder = -"
    ;;
  e)
    out="${4#-o}"
    case "$7" in
      docs/a.pdf) printf 'seven' > "$out/a.pdf" ;;
      broken.pdf) echo "ERROR: Data Error : broken.pdf" >&2; exit 2 ;;
      *) echo "No files to process" ;;
    esac
    ;;
esac
"#;

        fn reader_with_fake(dir: &Path) -> SevenZipReader {
            let sevenzip = fake_tool(dir, "7z", FAKE_7Z);
            SevenZipReader::new(Arc::new(ToolLocator::with_candidates(vec![], vec![sevenzip])))
        }

        fn leftover_scratch_dirs(dir: &Path) -> usize {
            fs::read_dir(dir)
                .unwrap()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(".pdfsift_"))
                .count()
        }

        #[test]
        fn test_list_and_extract() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());
            let archive = temp.path().join("bundle.7z");
            fs::write(&archive, b"7z").unwrap();

            let entries = reader.list_entries(&archive).unwrap();
            assert_eq!(entries, vec![ArchiveEntry::new("docs/a.pdf", 5)]);

            let out_dir = temp.path().join("out").join("docs");
            let destination = out_dir.join("a.pdf");
            reader.extract_entry(&archive, "docs/a.pdf", &destination).unwrap();

            assert_eq!(fs::read(&destination).unwrap(), b"seven");
            assert_eq!(leftover_scratch_dirs(&out_dir), 0);
        }

        #[test]
        fn test_entry_not_produced() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());
            let archive = temp.path().join("bundle.7z");
            fs::write(&archive, b"7z").unwrap();

            let out_dir = temp.path().join("out");
            let result = reader.extract_entry(&archive, "ghost.pdf", &out_dir.join("ghost.pdf"));
            assert!(matches!(result, Err(ExtractError::EntryNotFound(_))));
            assert_eq!(leftover_scratch_dirs(&out_dir), 0);
        }

        #[test]
        fn test_tool_failure_cleans_scratch_dir() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());
            let archive = temp.path().join("bundle.7z");
            fs::write(&archive, b"7z").unwrap();

            let out_dir = temp.path().join("out");
            let result = reader.extract_entry(&archive, "broken.pdf", &out_dir.join("broken.pdf"));
            match result {
                Err(ExtractError::ExtractionFailed(msg)) => assert!(msg.contains("Data Error")),
                other => panic!("Expected ExtractionFailed, got {:?}", other),
            }
            assert_eq!(leftover_scratch_dirs(&out_dir), 0);
        }

        #[test]
        fn test_listing_failure_is_archive_unreadable() {
            let _guard = lock();
            let temp = TempDir::new().unwrap();
            let reader = reader_with_fake(temp.path());

            let result = reader.list_entries(&temp.path().join("missing.7z"));
            assert!(matches!(result, Err(ExtractError::ArchiveUnreadable(_))));
        }
    }

    fn build_7z(path: &Path, entries: &[(&str, &[u8])]) {
        use std::fs::{self, File};

        let staging = tempfile::TempDir::new().unwrap();
        let mut writer = sevenz_rust::SevenZWriter::new(File::create(path).unwrap()).unwrap();

        for (name, data) in entries {
            let source = staging.path().join(name.replace('/', "_"));
            fs::write(&source, data).unwrap();
            let mut file = File::open(&source).unwrap();
            writer
                .push_archive_entry(
                    sevenz_rust::SevenZArchiveEntry::from_path(&source, name.to_string()),
                    Some(&mut file),
                )
                .unwrap();
        }

        writer.finish().unwrap();
    }

    /// Runs against a real 7-Zip when one is installed
    #[test]
    fn test_real_sevenzip_round_trip() {
        use crate::models::PdfsiftConfig;
        use std::fs;
        use tempfile::TempDir;

        let locator = Arc::new(ToolLocator::bootstrap(&PdfsiftConfig::default()));
        if locator.locate(Tool::SevenZip).is_none() {
            return;
        }

        #[cfg(unix)]
        let _guard = crate::core::archive::tool::test_support::lock();

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("real.7z");
        build_7z(&archive, &[("docs/a.pdf", "%PDF-1.4 real".as_bytes()), ("readme.txt", "hi".as_bytes())]);

        let reader = SevenZipReader::new(locator);
        let entries = reader.list_entries(&archive).unwrap();
        let pdf = entries
            .iter()
            .find(|e| e.base_name() == "a.pdf")
            .expect("a.pdf listed");
        assert_eq!(pdf.size, Some(13));

        let destination = temp.path().join("out").join("docs").join("a.pdf");
        reader.extract_entry(&archive, &pdf.name, &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), b"%PDF-1.4 real");
    }
}

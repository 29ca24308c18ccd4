use anyhow::{bail, Result};
use clap::Parser;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::archive::tool::ToolLocator;
use crate::core::archive::ArchiveTypeResolver;
use crate::core::engine::ExtractionEngine;
use crate::core::filter::PdfFilter;
use crate::models::{ArchiveEntry, ExtractError, ExtractionResult, PdfsiftConfig};
use crate::utils::progress::{ExtractionProgress, ProgressBarReporter};

#[derive(Parser, Debug)]
#[command(name = "pdfsift")]
#[command(version)]
#[command(about = "Extract PDF files from ZIP, RAR and 7z archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  pdfsift reports.zip -o ./pdfs        extract every PDF, keeping folders\n  \
  pdfsift scans.rar --flatten          put all PDFs directly in the output directory\n  \
  pdfsift bundle.7z -l                 list the PDFs without extracting\n\n\
RAR and 7z archives need WinRAR/unrar and 7-Zip installed.")]
pub struct Cli {
    /// Archive to read (.zip, .rar or .7z)
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory [default: <archive name>_pdfs next to the archive]
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Junk paths: extract every PDF directly into the output directory
    #[arg(short = 'j', long)]
    pub flatten: bool,

    /// Overwrite existing files WITHOUT prompting
    #[arg(long)]
    pub overwrite: bool,

    /// List matching PDFs without extracting
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds to wait for unrar/7z before giving up (0 = no limit)
    #[arg(long, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// More log output (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Output directory, defaulting to `<stem>_pdfs` beside the archive
    pub fn output_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.output {
            return dir.clone();
        }

        let stem = self
            .archive
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string());
        let parent = self
            .archive
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        parent.join(format!("{}_pdfs", stem))
    }

    /// Let command-line switches override loaded configuration
    pub fn apply_to(&self, config: &mut PdfsiftConfig) {
        if self.flatten {
            config.preserve_structure = false;
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if let Some(secs) = self.tool_timeout {
            config.tool_timeout_secs = secs;
        }
    }

    fn shows_progress(&self) -> bool {
        !(self.quiet || self.json || self.list)
    }
}

/// Run the extract command
///
/// Per-entry failures are part of a successful run and only show up in the
/// report; any returned error means the run was aborted.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut config = PdfsiftConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);

    if !ArchiveTypeResolver::is_supported(&cli.archive) {
        bail!(ExtractError::UnsupportedFormat(format!(
            "{} (expected .{})",
            cli.archive.display(),
            ArchiveTypeResolver::supported_extensions().join(", .")
        )));
    }

    if !cli.archive.is_file() {
        bail!(ExtractError::ArchiveUnreadable(format!(
            "{} does not exist",
            cli.archive.display()
        )));
    }

    let tools = Arc::new(ToolLocator::bootstrap(&config));
    let progress: Box<dyn ExtractionProgress> = if cli.shows_progress() {
        Box::new(ProgressBarReporter::new())
    } else {
        Box::new(ProgressBarReporter::hidden())
    };
    let engine = ExtractionEngine::new(tools).with_progress(progress);

    if cli.list {
        let matches = engine.scan(&cli.archive, &PdfFilter)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&matches)?);
        } else {
            print_listing(&matches);
        }
        return Ok(());
    }

    let output_dir = cli.output_dir();
    let result = engine.run(&cli.archive, &output_dir, config.extract_options(), &PdfFilter)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !cli.quiet {
        print_report(&result, &output_dir);
    } else {
        for message in &result.error_messages {
            eprintln!("{} {}", style("error:").red().bold(), message);
        }
    }

    Ok(())
}

fn print_listing(entries: &[ArchiveEntry]) {
    for entry in entries {
        let size = entry.size.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string());
        println!("{:>10}  {}", size, entry.name);
    }
    println!("{}", "-".repeat(40));
    let total: u64 = entries.iter().filter_map(|e| e.size).sum();
    println!("{:>10}  {} PDF files", total, entries.len());
}

fn print_report(result: &ExtractionResult, output_dir: &Path) {
    println!("{}", style("Extraction summary").bold());
    println!("  Archive size:       {}", format_size(result.total_archive_size));
    println!("  Entries in archive: {}", result.total_entries);
    println!("  PDF files found:    {}", result.pdf_files_found);
    println!(
        "  Extracted:          {} ({})",
        style(result.pdf_files_extracted).green(),
        format_size(result.extracted_pdf_size)
    );
    if result.skipped_existing > 0 {
        println!(
            "  Skipped (existing): {} (use --overwrite to replace)",
            style(result.skipped_existing).yellow()
        );
    }
    if result.has_errors() {
        println!("  Errors:             {}", style(result.errors_occurred).red());
    }
    println!("  Output directory:   {}", output_dir.display());

    if result.has_errors() {
        println!();
        println!("{}", style("Errors:").red().bold());
        for message in &result.error_messages {
            println!("  {}", message);
        }
    }
}

/// Format a byte size into a human-readable string
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

// Module declarations
pub mod models;
pub mod core;
pub mod commands;
pub mod utils;

use std::process::ExitCode;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use commands::extract::{execute, Cli};
use models::ExtractError;

pub use crate::core::archive::common::ArchiveReader;
pub use crate::core::archive::tool::{Tool, ToolLocator};
pub use crate::core::archive::ArchiveTypeResolver;
pub use crate::core::engine::ExtractionEngine;
pub use crate::core::filter::{EntryFilter, PdfFilter};
pub use crate::models::{
    ArchiveEntry, ArchiveFormat, ErrorKind, ExtractOptions, ExtractionOutcome, ExtractionResult,
    PdfsiftConfig,
};
pub use crate::utils::progress::{ExtractionProgress, ProgressBarReporter, SilentProgress};

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err.downcast_ref::<ExtractError>().map(ExtractError::kind);
            match kind {
                Some(kind) if cli.verbose > 0 => {
                    eprintln!("{} [{}] {:#}", style("error:").red().bold(), kind, err)
                }
                _ => eprintln!("{} {:#}", style("error:").red().bold(), err),
            }
            ExitCode::FAILURE
        }
    }
}

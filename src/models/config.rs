use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ExtractError;

/// Default bound on a single external tool invocation
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

/// Per-run extraction switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Recreate the in-archive folder layout under the output directory
    pub preserve_structure: bool,
    /// Replace files that already exist at the destination
    pub overwrite: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            preserve_structure: true,
            overwrite: false,
        }
    }
}

/// Application configuration
///
/// Merged from built-in defaults, an optional TOML file and `PDFSIFT_*`
/// environment variables, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfsiftConfig {
    /// Seconds to wait for unrar/7z before killing it; 0 waits forever
    pub tool_timeout_secs: u64,
    /// Explicit WinRAR/unrar executable, tried before the well-known locations
    pub winrar_path: Option<PathBuf>,
    /// Explicit 7z executable, tried before the well-known locations
    pub sevenzip_path: Option<PathBuf>,
    pub preserve_structure: bool,
    pub overwrite: bool,
}

impl Default for PdfsiftConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            winrar_path: None,
            sevenzip_path: None,
            preserve_structure: true,
            overwrite: false,
        }
    }
}

impl PdfsiftConfig {
    /// Load configuration
    ///
    /// # Arguments
    /// * `file` - Optional TOML file; it must exist when given
    ///
    /// # Returns
    /// * Merged configuration, or `InvalidConfig` on unreadable or mistyped values
    pub fn load(file: Option<&Path>) -> Result<Self, ExtractError> {
        Self::load_with_env(file, Environment::with_prefix("PDFSIFT").try_parsing(true))
    }

    fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self, ExtractError> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            if !path.is_file() {
                return Err(ExtractError::InvalidConfig(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml));
        }

        let config = builder.add_source(env).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Tool timeout as a `Duration`, `None` when disabled
    pub fn tool_timeout(&self) -> Option<Duration> {
        match self.tool_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            preserve_structure: self.preserve_structure,
            overwrite: self.overwrite,
        }
    }
}

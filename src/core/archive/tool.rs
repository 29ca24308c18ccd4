// External archive tool discovery and invocation

use once_cell::sync::OnceCell;
use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::{ExtractError, PdfsiftConfig};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// External utilities the RAR and 7z readers shell out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    WinRar,
    SevenZip,
}

impl Tool {
    /// Executable names looked up on `PATH` when no fixed location matches
    fn path_names(&self) -> &'static [&'static str] {
        match self {
            Tool::WinRar => &["unrar", "rar", "UnRAR", "WinRAR"],
            Tool::SevenZip => &["7z", "7zz", "7za"],
        }
    }

    /// Well-known installation locations, in lookup order
    fn well_known_locations(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();

        match self {
            Tool::WinRar => {
                for root in [r"C:\Program Files", r"C:\Program Files (x86)"] {
                    candidates.push(Path::new(root).join("WinRAR").join("UnRAR.exe"));
                    candidates.push(Path::new(root).join("WinRAR").join("WinRAR.exe"));
                }
            }
            Tool::SevenZip => {
                for root in [r"C:\Program Files", r"C:\Program Files (x86)"] {
                    candidates.push(Path::new(root).join("7-Zip").join("7z.exe"));
                }
                candidates.push(PathBuf::from(r"C:\ProgramData\chocolatey\bin\7z.exe"));
            }
        }

        for dir in ["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"] {
            for name in self.path_names() {
                candidates.push(Path::new(dir).join(name));
            }
        }

        candidates
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::WinRar => f.write_str("WinRAR/unrar"),
            Tool::SevenZip => f.write_str("7-Zip"),
        }
    }
}

struct ToolSlot {
    candidates: Vec<PathBuf>,
    search_path: bool,
    resolved: OnceCell<Option<PathBuf>>,
}

impl ToolSlot {
    fn new(candidates: Vec<PathBuf>, search_path: bool) -> Self {
        Self {
            candidates,
            search_path,
            resolved: OnceCell::new(),
        }
    }
}

/// Locates external archive tools and caches the answer
///
/// Built once per process and shared with the readers that need it. Each
/// tool is looked up at most once; a miss is cached as well, so a tool
/// installed mid-run is not noticed.
pub struct ToolLocator {
    winrar: ToolSlot,
    sevenzip: ToolSlot,
    timeout: Option<Duration>,
}

impl ToolLocator {
    /// Build the locator for this process from configuration
    ///
    /// Configured paths come first, then the well-known install locations,
    /// then a `PATH` search.
    pub fn bootstrap(config: &PdfsiftConfig) -> Self {
        let with_override = |tool: Tool, configured: &Option<PathBuf>| {
            let mut candidates: Vec<PathBuf> = configured.iter().cloned().collect();
            candidates.extend(tool.well_known_locations());
            ToolSlot::new(candidates, true)
        };

        Self {
            winrar: with_override(Tool::WinRar, &config.winrar_path),
            sevenzip: with_override(Tool::SevenZip, &config.sevenzip_path),
            timeout: config.tool_timeout(),
        }
    }

    /// Build a locator that only considers the given candidates
    pub fn with_candidates(winrar: Vec<PathBuf>, sevenzip: Vec<PathBuf>) -> Self {
        Self {
            winrar: ToolSlot::new(winrar, false),
            sevenzip: ToolSlot::new(sevenzip, false),
            timeout: PdfsiftConfig::default().tool_timeout(),
        }
    }

    /// Bound applied to every tool invocation
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Path of the first existing candidate for `tool`, or `None`
    pub fn locate(&self, tool: Tool) -> Option<&Path> {
        let slot = match tool {
            Tool::WinRar => &self.winrar,
            Tool::SevenZip => &self.sevenzip,
        };

        slot.resolved
            .get_or_init(|| {
                let found = slot
                    .candidates
                    .iter()
                    .find(|candidate| candidate.is_file())
                    .cloned()
                    .or_else(|| {
                        if !slot.search_path {
                            return None;
                        }
                        tool.path_names().iter().find_map(|name| which::which(name).ok())
                    });

                match &found {
                    Some(path) => debug!(%tool, path = %path.display(), "located archive tool"),
                    None => debug!(%tool, "archive tool not found"),
                }
                found
            })
            .as_deref()
    }

    /// Like [`locate`](Self::locate), but a miss is a `ToolNotFound` error
    pub fn require(&self, tool: Tool) -> Result<&Path, ExtractError> {
        self.locate(tool)
            .ok_or_else(|| ExtractError::ToolNotFound(tool.to_string()))
    }
}

/// Which adapter operation a tool call belongs to
///
/// Decides how a failed invocation is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStage {
    Listing,
    Extracting,
}

impl ToolStage {
    pub fn error(&self, message: String) -> ExtractError {
        match self {
            ToolStage::Listing => ExtractError::ArchiveUnreadable(message),
            ToolStage::Extracting => ExtractError::ExtractionFailed(message),
        }
    }
}

/// Captured result of a finished tool process
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Short human-readable reason for a failed run
    pub fn diagnostic(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };

        let lines: Vec<&str> = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let tail = &lines[lines.len().saturating_sub(3)..];

        match self.status.code() {
            Some(code) if tail.is_empty() => format!("exit code {}", code),
            Some(code) => format!("exit code {}: {}", code, tail.join(" | ")),
            None => format!("terminated by signal: {}", tail.join(" | ")),
        }
    }
}

/// Run an external tool to completion
///
/// # Arguments
/// * `tool` - Which tool is being run (for error messages)
/// * `program` - Located executable
/// * `args` - Arguments, passed verbatim
/// * `timeout` - Kill the process and fail with `ToolTimedOut` past this bound
/// * `stage` - Classifies a failure to start the process
pub fn run_tool(
    tool: Tool,
    program: &Path,
    args: &[OsString],
    timeout: Option<Duration>,
    stage: ToolStage,
) -> Result<ToolOutput, ExtractError> {
    debug!(%tool, program = %program.display(), ?args, "invoking archive tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| stage.error(format!("Failed to start {}: {}", program.display(), e)))?;

    // Drain both pipes on their own threads so a chatty tool never blocks on a full pipe
    let deadline = timeout.map(|limit| Instant::now() + limit);
    let stdout_rx = spawn_reader(child.stdout.take());
    let stderr_rx = spawn_reader(child.stderr.take());

    let timed_out = || ExtractError::ToolTimedOut {
        tool: tool.to_string(),
        timeout: timeout.unwrap_or_default(),
    };

    let status = match deadline {
        None => child
            .wait()
            .map_err(|e| stage.error(format!("Failed to wait for {}: {}", tool, e)))?,
        Some(deadline) => loop {
            let polled = child
                .try_wait()
                .map_err(|e| stage.error(format!("Failed to wait for {}: {}", tool, e)))?;
            if let Some(status) = polled {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out());
            }
            thread::sleep(POLL_INTERVAL);
        },
    };

    // A background process the tool left behind may still hold the pipes open
    let stdout = collect_stream(&stdout_rx, deadline).ok_or_else(timed_out)?;
    let stderr = collect_stream(&stderr_rx, deadline).ok_or_else(timed_out)?;

    debug!(%tool, code = ?status.code(), "archive tool finished");

    Ok(ToolOutput {
        status,
        stdout: decode_output(&stdout),
        stderr: decode_output(&stderr),
    })
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_stream(stream));
    });
    rx
}

/// Wait for a reader thread's bytes; `None` once the deadline has passed
fn collect_stream(rx: &Receiver<Vec<u8>>, deadline: Option<Instant>) -> Option<Vec<u8>> {
    let Some(deadline) = deadline else {
        return Some(rx.recv().unwrap_or_default());
    };

    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Some(bytes),
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn read_stream<R: Read>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf);
    }
    buf
}

/// Decode tool output, falling back to Windows-1252 for legacy code pages
pub fn decode_output(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard};

    // Writing a script while another test thread forks can leave the write
    // handle open in the child and make exec fail with ETXTBSY.
    static TOOL_LOCK: Mutex<()> = Mutex::new(());

    pub fn lock() -> MutexGuard<'static, ()> {
        TOOL_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write an executable shell script standing in for unrar/7z
    pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

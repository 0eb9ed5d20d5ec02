//! ffmpeg integration
//!
//! Segments are joined with ffmpeg's concat demuxer, which reads an ordered
//! manifest of `file '<path>'` lines. Joining WAV segments copies the stream;
//! the final pass re-encodes to the configured compressed codec.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::LineupConfig;
use crate::error::{LineupError, Result};

/// How many trailing stderr lines end up in an error message
const STDERR_TAIL_LINES: usize = 5;

/// Ordered list of files for the concat demuxer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatManifest {
    entries: Vec<PathBuf>,
}

impl ConcatManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(path.into());
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Manifest text, one `file '<path>'` line per entry
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|path| format!("file '{}'", escape_path(path)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Read back a manifest produced by [`ConcatManifest::render`]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let quoted = line.trim().strip_prefix("file ")?;
                let inner = quoted.strip_prefix('\'')?.strip_suffix('\'')?;
                Some(PathBuf::from(inner.replace("'\\''", "'")))
            })
            .collect();
        Self { entries }
    }
}

impl FromIterator<PathBuf> for ConcatManifest {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Forward slashes everywhere, single quotes closed and re-opened around an escaped quote
fn escape_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', "'\\''")
}

/// What the final encode reads from
#[derive(Debug, Clone, Copy)]
pub enum EncodeInput<'a> {
    /// A single WAV file
    File(&'a Path),
    /// A concat manifest listing several WAV files
    Manifest(&'a Path),
}

/// Audio joining and transcoding, as the pipeline needs it
#[async_trait]
pub trait AudioEncoder: Send + Sync {
    /// Join the files listed in `manifest` into one WAV at `output` without re-encoding
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<()>;

    /// Encode `input` into the final compressed file at `output`
    async fn encode(&self, input: EncodeInput<'_>, output: &Path) -> Result<()>;
}

/// [`AudioEncoder`] that shells out to an ffmpeg binary
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    codec: String,
    timeout: Duration,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>, codec: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            codec: codec.into(),
            timeout,
        }
    }

    pub fn from_config(config: &LineupConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.audio_codec.clone(),
            config.tool_timeout(),
        )
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, what: &str, args: Vec<OsString>) -> Result<()> {
        log::info!(
            "Running: {} {}",
            self.binary.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                LineupError::Tool(format!(
                    "Failed to start {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        // Dropping the child on timeout kills it.
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                log::error!("{} timed out after {:?}", what, self.timeout);
                return Err(LineupError::Timeout {
                    what: what.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr_tail(&stderr);
            log::error!("{} failed with status {}: {}", what, output.status, tail);
            return Err(LineupError::Tool(format!(
                "{} failed with status {}: {}",
                what, output.status, tail
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl AudioEncoder for Ffmpeg {
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<()> {
        self.run("ffmpeg concat", concat_args(manifest, output)).await
    }

    async fn encode(&self, input: EncodeInput<'_>, output: &Path) -> Result<()> {
        self.run("ffmpeg encode", encode_args(input, &self.codec, output))
            .await
    }
}

fn base_args() -> Vec<OsString> {
    ["-hide_banner", "-loglevel", "error"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

fn concat_input_args(manifest: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-f", "concat", "-safe", "0", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(manifest.as_os_str().to_owned());
    args
}

/// Arguments for a stream-copy join of WAV segments
fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    let mut args = base_args();
    args.extend(concat_input_args(manifest));
    args.extend(["-c", "copy", "-y"].into_iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}

/// Arguments for the final encode
fn encode_args(input: EncodeInput<'_>, codec: &str, output: &Path) -> Vec<OsString> {
    let mut args = base_args();
    match input {
        EncodeInput::File(path) => {
            args.push("-i".into());
            args.push(path.as_os_str().to_owned());
        }
        EncodeInput::Manifest(path) => args.extend(concat_input_args(path)),
    }
    args.extend(["-c:a", codec, "-y"].into_iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

/// Whether `binary -version` runs successfully
pub async fn check_installed(binary: &Path) -> bool {
    match Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(e) => {
            log::warn!("{} is not usable: {}", binary.display(), e);
            false
        }
    }
}

/// Version string reported by `binary -version`, e.g. `6.1.1`
pub async fn version(binary: &Path) -> Result<String> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| LineupError::Tool(format!("Failed to start {}: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(LineupError::Tool(format!(
            "{} -version failed with status {}",
            binary.display(),
            output.status
        )));
    }

    parse_version(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| LineupError::Tool("Could not parse ffmpeg version".to_string()))
}

fn parse_version(banner: &str) -> Option<String> {
    let re = Regex::new(r"ffmpeg version (\S+)").ok()?;
    re.captures(banner)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

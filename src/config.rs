//! Configuration for voice-lineup
//!
//! The configuration is a plain value handed to constructors, so several
//! setups (a real server, a mock server in tests) can live side by side.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LineupError, Result};

/// Default address of a locally running VOICEVOX engine
pub const DEFAULT_API_URL: &str = "http://localhost:50021";

/// Library configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LineupConfig {
    /// Base URL of the synthesis server
    pub api_url: String,
    /// Where finished files (and per-run temp files) are written
    pub output_dir: PathBuf,
    /// Where per-style preview samples are kept
    pub preview_dir: PathBuf,
    /// JSON array of favorite speaker identifiers
    pub favorites_path: PathBuf,
    /// ffmpeg binary, either a bare name looked up in PATH or a full path
    pub ffmpeg_path: PathBuf,
    /// Upper bound for a single HTTP round trip
    pub request_timeout_secs: u64,
    /// Upper bound for a single ffmpeg invocation
    pub tool_timeout_secs: u64,
    /// ffmpeg audio encoder used for the final file
    pub audio_codec: String,
    /// Extension of the final file, without the dot
    pub output_extension: String,
    /// Line spoken in preview samples
    pub preview_text: String,
}

impl Default for LineupConfig {
    fn default() -> Self {
        let output_dir = PathBuf::from("output");
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            preview_dir: output_dir.join("previews"),
            output_dir,
            favorites_path: PathBuf::from("favorites.json"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            request_timeout_secs: 60,
            tool_timeout_secs: 300,
            audio_codec: "libmp3lame".to_string(),
            output_extension: "mp3".to_string(),
            preview_text: "こんにちは。この声でお話しします。".to_string(),
        }
    }
}

impl LineupConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file is not an error: defaults are written to `path` and returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject values that would make every run fail
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(LineupError::Configuration("api_url is empty".to_string()));
        }
        if self.output_extension.trim().is_empty() {
            return Err(LineupError::Configuration(
                "output_extension is empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 || self.tool_timeout_secs == 0 {
            return Err(LineupError::Configuration(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

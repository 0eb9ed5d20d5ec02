//! Error types for voice-lineup
//!
//! Every fallible operation in the crate returns [`LineupError`].

use thiserror::Error;

/// Errors raised by the library
#[derive(Debug, Error)]
pub enum LineupError {
    /// The synthesis server could not be reached or the transfer broke off
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The synthesis server answered with something other than 200
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Synthesis parameters, speaker list, config or favorites were not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Waveform container could not be written or read
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// The external transcoder failed to start or exited with an error
    #[error("Tool error: {0}")]
    Tool(String),

    /// A network call or tool invocation ran past its configured bound
    #[error("{what} timed out after {seconds}s")]
    Timeout { what: String, seconds: u64 },

    /// The request itself is malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Nothing was synthesized, so there is nothing to assemble
    #[error("No audio files were generated")]
    NoAudioProduced,

    /// The run was cancelled between steps
    #[error("Generation was cancelled")]
    Cancelled,

    /// The configuration cannot be used
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LineupError {
    /// Short machine-readable category, handy for front ends that map errors to UI states
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::Api { .. } => "api",
            Self::Json(_) => "parse",
            Self::Io(_) | Self::Wav(_) => "io",
            Self::Tool(_) => "tool",
            Self::Timeout { .. } => "timeout",
            Self::InvalidRequest(_) | Self::NoAudioProduced => "request",
            Self::Cancelled => "cancelled",
            Self::Configuration(_) => "configuration",
        }
    }
}

/// Result type for voice-lineup
pub type Result<T> = std::result::Result<T, LineupError>;

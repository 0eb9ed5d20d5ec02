//! voice-lineup: render one line of text with many synthetic voices
//!
//! Every selected speaker reads the same line through a VOICEVOX-compatible
//! server, optionally announcing their own name first. The takes are joined
//! in selection order, with a configurable pause between speakers, into a
//! single compressed file encoded by ffmpeg.
//!
//! ```no_run
//! use voice_lineup::{GenerationRequest, LineupConfig, VoiceLineup};
//!
//! # async fn demo() -> voice_lineup::Result<()> {
//! let lineup = VoiceLineup::new(LineupConfig::default())?;
//! let catalog = lineup.characters().await?;
//! let voices: Vec<(u32, String)> = catalog
//!     .normal_styles()
//!     .into_iter()
//!     .map(|entry| (entry.speaker_id, entry.speaker_name))
//!     .collect();
//! let request = GenerationRequest::new("おはようございます", voices);
//! let output = lineup.generate(&request, None).await?;
//! println!("{}", output.display());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod ffmpeg;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod previews;
pub mod progress;
pub mod temp;
pub mod voicevox;
pub mod wav;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use crate::catalog::{Catalog, StyleEntry};
pub use crate::config::LineupConfig;
pub use crate::error::{LineupError, Result};
pub use crate::favorites::FavoritesStore;
pub use crate::ffmpeg::{AudioEncoder, Ffmpeg};
pub use crate::models::{GenerationRequest, Speaker, SpeakerStyle};
pub use crate::pipeline::AudioPipeline;
pub use crate::previews::PreviewLibrary;
pub use crate::progress::{progress_channel, ProgressEvent, ProgressSender, ProgressStream};
pub use crate::voicevox::{VoiceEngine, VoicevoxClient};

/// Availability of the external transcoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub ffmpeg_installed: bool,
    pub ffmpeg_version: Option<String>,
}

/// Everything a front end needs, wired from one [`LineupConfig`]
#[derive(Clone)]
pub struct VoiceLineup {
    config: LineupConfig,
    engine: Arc<dyn VoiceEngine>,
    pipeline: AudioPipeline,
}

impl VoiceLineup {
    /// Real HTTP client and ffmpeg encoder
    pub fn new(config: LineupConfig) -> Result<Self> {
        config.validate()?;
        let engine: Arc<dyn VoiceEngine> = Arc::new(VoicevoxClient::new(&config)?);
        let encoder: Arc<dyn AudioEncoder> = Arc::new(Ffmpeg::from_config(&config));
        Ok(Self::with_parts(config, engine, encoder))
    }

    /// Custom engine and encoder, e.g. a different server or a test double
    pub fn with_parts(
        config: LineupConfig,
        engine: Arc<dyn VoiceEngine>,
        encoder: Arc<dyn AudioEncoder>,
    ) -> Self {
        let pipeline = AudioPipeline::new(&config, engine.clone(), encoder);
        Self {
            config,
            engine,
            pipeline,
        }
    }

    pub fn config(&self) -> &LineupConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &AudioPipeline {
        &self.pipeline
    }

    /// Speakers and styles offered by the server
    pub async fn characters(&self) -> Result<Catalog> {
        let speakers = self.engine.speakers().await?;
        Ok(Catalog::new(speakers))
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        progress: Option<ProgressSender>,
    ) -> Result<PathBuf> {
        self.pipeline.generate(request, progress).await
    }

    pub async fn generate_cancellable(
        &self,
        request: &GenerationRequest,
        progress: Option<ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.pipeline
            .generate_cancellable(request, progress, cancel)
            .await
    }

    pub fn favorites(&self) -> FavoritesStore {
        FavoritesStore::new(&self.config.favorites_path)
    }

    pub fn previews(&self) -> PreviewLibrary {
        PreviewLibrary::new(&self.config, &self.pipeline)
    }

    /// Probe the configured ffmpeg binary
    pub async fn check_tools(&self) -> ToolStatus {
        let binary = &self.config.ffmpeg_path;
        let ffmpeg_installed = ffmpeg::check_installed(binary).await;
        let ffmpeg_version = if ffmpeg_installed {
            match ffmpeg::version(binary).await {
                Ok(version) => Some(version),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            }
        } else {
            None
        };

        ToolStatus {
            ffmpeg_installed,
            ffmpeg_version,
        }
    }
}

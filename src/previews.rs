//! Short per-style sample clips, one file per style id

use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, StyleEntry};
use crate::config::LineupConfig;
use crate::error::Result;
use crate::models::GenerationRequest;
use crate::pipeline::AudioPipeline;
use crate::progress::{ProgressReporter, ProgressSender};

/// Preview directory plus the pipeline that fills it
#[derive(Clone)]
pub struct PreviewLibrary {
    pipeline: AudioPipeline,
    extension: String,
    text: String,
}

impl PreviewLibrary {
    /// Previews are rendered by `pipeline` redirected into `config.preview_dir`
    pub fn new(config: &LineupConfig, pipeline: &AudioPipeline) -> Self {
        Self {
            pipeline: pipeline.with_output_dir(&config.preview_dir),
            extension: config.output_extension.clone(),
            text: config.preview_text.clone(),
        }
    }

    /// Directory holding every preview file
    pub fn asset_path(&self) -> &Path {
        self.pipeline.output_dir()
    }

    pub fn preview_path(&self, style_id: u32) -> PathBuf {
        self.asset_path()
            .join(format!("{}.{}", style_id, self.extension))
    }

    /// Styles of `catalog` that have no preview file yet
    pub fn missing(&self, catalog: &Catalog) -> Vec<StyleEntry> {
        catalog
            .entries()
            .into_iter()
            .filter(|entry| !self.preview_path(entry.speaker_id).exists())
            .collect()
    }

    /// Render a preview for every style that lacks one.
    ///
    /// `progress` receives one event per preview. Stops at the first failure;
    /// previews written before it are kept.
    pub async fn generate_missing(
        &self,
        catalog: &Catalog,
        progress: Option<ProgressSender>,
    ) -> Result<Vec<PathBuf>> {
        let missing = self.missing(catalog);
        if missing.is_empty() {
            log::info!("All {} previews present", catalog.entries().len());
            return Ok(Vec::new());
        }

        log::info!(
            "Generating {} previews into {}",
            missing.len(),
            self.asset_path().display()
        );
        let mut reporter = ProgressReporter::new(missing.len(), progress);
        let mut generated = Vec::with_capacity(missing.len());

        for entry in &missing {
            reporter.report(format!("Preview: {}", entry.display_name(true)));
            let request = self.request_for(entry);
            match self.pipeline.generate(&request, None).await {
                Ok(path) => generated.push(path),
                Err(e) => {
                    reporter.fail(format!("Error: {}", e));
                    return Err(e);
                }
            }
        }

        Ok(generated)
    }

    fn request_for(&self, entry: &StyleEntry) -> GenerationRequest {
        GenerationRequest {
            output_base_name: entry.speaker_id.to_string(),
            prepend_name: false,
            interval_seconds: 0.0,
            ..GenerationRequest::new(
                self.text.clone(),
                [(entry.speaker_id, entry.display_name(true))],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::error::LineupError;
    use crate::ffmpeg::{AudioEncoder, EncodeInput};
    use crate::models::{Speaker, SpeakerStyle};
    use crate::progress::progress_channel;
    use crate::voicevox::{AudioQuery, VoiceEngine};

    #[derive(Default)]
    struct EchoEngine {
        spoken: Mutex<Vec<(u32, String)>>,
        reject: Option<u32>,
    }

    #[async_trait]
    impl VoiceEngine for EchoEngine {
        async fn speakers(&self) -> Result<Vec<Speaker>> {
            Ok(Vec::new())
        }

        async fn audio_query(&self, speaker: u32, text: &str) -> Result<AudioQuery> {
            if self.reject == Some(speaker) {
                return Err(LineupError::Api {
                    status: 404,
                    body: "no such style".to_string(),
                });
            }
            self.spoken.lock().unwrap().push((speaker, text.to_string()));
            Ok(json!({ "text": text }))
        }

        async fn synthesis(&self, speaker: u32, _query: &AudioQuery) -> Result<Bytes> {
            Ok(Bytes::from(format!("wav-{}", speaker)))
        }
    }

    struct CopyEncoder;

    #[async_trait]
    impl AudioEncoder for CopyEncoder {
        async fn concat(&self, _manifest: &Path, _output: &Path) -> Result<()> {
            Err(LineupError::Tool("previews never concatenate".to_string()))
        }

        async fn encode(&self, input: EncodeInput<'_>, output: &Path) -> Result<()> {
            match input {
                EncodeInput::File(path) => {
                    tokio::fs::copy(path, output).await?;
                    Ok(())
                }
                EncodeInput::Manifest(_) => {
                    Err(LineupError::Tool("previews are single files".to_string()))
                }
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![Speaker {
            name: "ずんだもん".to_string(),
            speaker_uuid: "388f246b".to_string(),
            styles: vec![
                SpeakerStyle { id: 3, name: "ノーマル".to_string() },
                SpeakerStyle { id: 1, name: "あまあま".to_string() },
                SpeakerStyle { id: 7, name: "ツンツン".to_string() },
            ],
        }])
    }

    fn library(dir: &Path, engine: Arc<EchoEngine>) -> PreviewLibrary {
        let config = LineupConfig {
            output_dir: dir.join("output"),
            preview_dir: dir.join("previews"),
            ..LineupConfig::default()
        };
        let pipeline = AudioPipeline::new(&config, engine, Arc::new(CopyEncoder));
        PreviewLibrary::new(&config, &pipeline)
    }

    #[test]
    fn paths_are_keyed_by_style_id() {
        let dir = tempfile::tempdir().unwrap();
        let previews = library(dir.path(), Arc::default());
        assert_eq!(previews.asset_path(), dir.path().join("previews"));
        assert_eq!(previews.preview_path(3), dir.path().join("previews").join("3.mp3"));
    }

    #[tokio::test]
    async fn only_missing_previews_are_generated() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(EchoEngine::default());
        let previews = library(dir.path(), engine.clone());

        std::fs::create_dir_all(previews.asset_path()).unwrap();
        std::fs::write(previews.preview_path(1), b"existing").unwrap();
        let missing: Vec<u32> = previews.missing(&catalog()).iter().map(|e| e.speaker_id).collect();
        assert_eq!(missing, vec![3, 7]);

        let (tx, mut rx) = progress_channel();
        let generated = previews.generate_missing(&catalog(), Some(tx)).await.unwrap();

        assert_eq!(generated, vec![previews.preview_path(3), previews.preview_path(7)]);
        assert_eq!(std::fs::read(previews.preview_path(7)).unwrap(), b"wav-7");
        assert!(previews.missing(&catalog()).is_empty());

        let spoken = engine.spoken.lock().unwrap().clone();
        let preview_text = LineupConfig::default().preview_text;
        assert_eq!(spoken, vec![(3, preview_text.clone()), (7, preview_text)]);

        let percents: Vec<u8> = rx.drain().iter().map(|e| e.percent).collect();
        assert_eq!(percents, vec![50, 100]);
    }

    #[tokio::test]
    async fn nothing_to_do_when_all_present() {
        let dir = tempfile::tempdir().unwrap();
        let previews = library(dir.path(), Arc::default());
        std::fs::create_dir_all(previews.asset_path()).unwrap();
        for id in [1, 3, 7] {
            std::fs::write(previews.preview_path(id), b"x").unwrap();
        }

        assert!(previews.generate_missing(&catalog(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_earlier_previews() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(EchoEngine {
            reject: Some(1),
            ..EchoEngine::default()
        });
        let previews = library(dir.path(), engine);

        let err = previews.generate_missing(&catalog(), None).await.unwrap_err();

        assert!(matches!(err, LineupError::Api { status: 404, .. }));
        assert!(previews.preview_path(3).exists());
        assert!(!previews.preview_path(1).exists());
        assert!(!previews.preview_path(7).exists());
    }
}

//! Audio assembly pipeline
//!
//! Renders one line of text with every selected speaker, one speaker at a
//! time and in list order, then stitches the takes into a single compressed
//! file. A run with `n` speakers reports `n * 3 + 1` steps when speaker names
//! are announced and `n + 1` otherwise.
//!
//! Per speaker, with name announcement:
//! 1. synthesize the speaker's display name
//! 2. write one second of silence
//! 3. synthesize the requested line
//! 4. stream-copy name, silence and line into one WAV
//!
//! Without announcement the synthesized line is the speaker's segment as is.
//! The final step encodes the single segment directly, or joins all segments
//! (with an optional silence gap between neighbours) while encoding.
//!
//! Every intermediate file is removed before `generate` returns, whatever
//! the outcome. The final encode writes to a run-private file that replaces
//! the output only on success, so a failed rerun leaves an earlier result alone.
//!
//! ffmpeg resolves relative manifest entries against the manifest's own
//! directory, so intermediates always live under an absolute work directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::LineupConfig;
use crate::error::{LineupError, Result};
use crate::ffmpeg::{AudioEncoder, ConcatManifest, EncodeInput};
use crate::models::{speaker_label, GenerationRequest};
use crate::progress::{ProgressReporter, ProgressSender};
use crate::temp::{AudioSegment, SegmentRole, TempFiles};
use crate::voicevox::VoiceEngine;
use crate::wav;

/// Pause between an announced name and the line, in seconds
pub const NAME_PAUSE_SECS: f64 = 1.0;

/// Sequential text-to-speech assembly over a [`VoiceEngine`] and an [`AudioEncoder`]
#[derive(Clone)]
pub struct AudioPipeline {
    engine: Arc<dyn VoiceEngine>,
    encoder: Arc<dyn AudioEncoder>,
    output_dir: PathBuf,
    output_extension: String,
}

impl AudioPipeline {
    pub fn new(
        config: &LineupConfig,
        engine: Arc<dyn VoiceEngine>,
        encoder: Arc<dyn AudioEncoder>,
    ) -> Self {
        Self {
            engine,
            encoder,
            output_dir: config.output_dir.clone(),
            output_extension: config.output_extension.clone(),
        }
    }

    /// Same engine and encoder, writing into `dir`
    pub fn with_output_dir(&self, dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: dir.into(),
            ..self.clone()
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the final file of `request` ends up
    pub fn output_path(&self, request: &GenerationRequest) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", request.file_stem(), self.output_extension))
    }

    /// Run `request` to completion and return the path of the final file
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        progress: Option<ProgressSender>,
    ) -> Result<PathBuf> {
        self.generate_cancellable(request, progress, &CancellationToken::new())
            .await
    }

    /// Like [`AudioPipeline::generate`], stopping at the next step boundary once `cancel` fires
    pub async fn generate_cancellable(
        &self,
        request: &GenerationRequest,
        progress: Option<ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let mut reporter = ProgressReporter::new(request.total_steps(), progress);
        let mut temp = TempFiles::new(work_dir(&self.output_dir));

        log::info!(
            "Run {}: {} speakers, prepend_name={}, interval={}s",
            temp.namespace(),
            request.speaker_ids.len(),
            request.prepend_name,
            request.interval_seconds
        );

        let result = self.run(request, &mut reporter, &mut temp, cancel).await;

        if let Err(e) = &result {
            log::error!("Run {} failed: {}", temp.namespace(), e);
            reporter.fail(format!("Error: {}", e));
        }
        temp.cleanup().await;

        if let Ok(path) = &result {
            log::info!("Run {} finished: {}", temp.namespace(), path.display());
        }
        result
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        reporter: &mut ProgressReporter,
        temp: &mut TempFiles,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        request.validate()?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let total = request.speaker_ids.len();
        let mut segments = Vec::with_capacity(total);
        let speakers = request.speaker_ids.iter().zip(&request.speaker_names);

        for (index, (&speaker_id, name)) in speakers.enumerate() {
            let label = speaker_label(speaker_id, name);
            let prefix = format!("[{}/{}] {}", index + 1, total, label);

            let segment = if request.prepend_name {
                check_cancelled(cancel)?;
                reporter.report(format!("{}: generating name...", prefix));
                let name = temp.reserve_segment(SegmentRole::NameAnnouncement);
                self.synthesize_to(speaker_id, &label, &name).await?;

                let pause = temp.reserve_segment(SegmentRole::Silence);
                wav::write_silent_wav(&pause.path, NAME_PAUSE_SECS).await?;

                check_cancelled(cancel)?;
                reporter.report(format!("{}: generating line...", prefix));
                let line = temp.reserve_segment(SegmentRole::SpokenText);
                self.synthesize_to(speaker_id, &request.text, &line).await?;

                check_cancelled(cancel)?;
                reporter.report(format!("{}: merging audio...", prefix));
                let manifest: ConcatManifest = [name.path, pause.path, line.path]
                    .into_iter()
                    .collect();
                let joined = temp.reserve_segment(SegmentRole::SpeakerFinal);
                let manifest_path = write_manifest(temp, &manifest).await?;
                self.encoder.concat(&manifest_path, &joined.path).await?;
                joined
            } else {
                check_cancelled(cancel)?;
                reporter.report(format!("{}: generating audio...", prefix));
                let segment = temp.reserve_segment(SegmentRole::SpeakerFinal);
                self.synthesize_to(speaker_id, &request.text, &segment).await?;
                segment
            };

            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(LineupError::NoAudioProduced);
        }

        check_cancelled(cancel)?;
        let output = self.output_path(request);
        reporter.report("Merging and encoding final file...");

        let staged = temp.reserve("encoded", &self.output_extension);
        self.assemble(&segments, request.interval_seconds, &staged, temp)
            .await?;
        tokio::fs::rename(&staged, &output).await?;

        Ok(output)
    }

    /// One `audio_query` + `synthesis` round trip, written to `segment`
    async fn synthesize_to(&self, speaker_id: u32, text: &str, segment: &AudioSegment) -> Result<()> {
        let wav_bytes = self.engine.synthesize(speaker_id, text).await?;

        match wav::wav_duration(&wav_bytes) {
            Ok(seconds) => log::debug!(
                "Speaker {} {} segment: {:.2}s",
                speaker_id,
                segment.role.as_str(),
                seconds
            ),
            Err(e) => log::debug!("Could not read duration of synthesized audio: {}", e),
        }

        tokio::fs::write(&segment.path, &wav_bytes).await?;
        Ok(())
    }

    /// Encode the per-speaker segments into the final file
    async fn assemble(
        &self,
        segments: &[AudioSegment],
        interval_seconds: f64,
        output: &Path,
        temp: &mut TempFiles,
    ) -> Result<()> {
        if let [only] = segments {
            return self
                .encoder
                .encode(EncodeInput::File(&only.path), output)
                .await;
        }

        let gap = if interval_seconds > 0.0 {
            let gap = temp.reserve_segment(SegmentRole::Silence);
            wav::write_silent_wav(&gap.path, interval_seconds).await?;
            Some(gap)
        } else {
            None
        };

        let manifest = interleave(segments, gap.as_ref());
        let manifest_path = write_manifest(temp, &manifest).await?;
        self.encoder
            .encode(EncodeInput::Manifest(&manifest_path), output)
            .await
    }
}

/// Segments in order, with `gap` between every pair of neighbours
fn interleave(segments: &[AudioSegment], gap: Option<&AudioSegment>) -> ConcatManifest {
    let mut manifest = ConcatManifest::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            if let Some(gap) = gap {
                manifest.push(gap.path.clone());
            }
        }
        manifest.push(segment.path.clone());
    }
    manifest
}

async fn write_manifest(temp: &mut TempFiles, manifest: &ConcatManifest) -> Result<PathBuf> {
    let path = temp.reserve_manifest();
    tokio::fs::write(&path, manifest.render()).await?;
    Ok(path)
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(LineupError::Cancelled)
    } else {
        Ok(())
    }
}

/// Absolute form of `dir`, used for every intermediate file of a run
fn work_dir(dir: &Path) -> PathBuf {
    match std::path::absolute(dir) {
        Ok(absolute) => absolute,
        Err(e) => {
            log::warn!("Could not resolve {}: {}", dir.display(), e);
            dir.to_path_buf()
        }
    }
}

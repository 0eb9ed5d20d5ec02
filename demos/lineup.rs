//! Render one line with the default style of every speaker on a local engine.
//!
//! ```text
//! cargo run --example lineup -- "おはようございます" [config.json]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use voice_lineup::logger::init_logger;
use voice_lineup::{progress_channel, GenerationRequest, LineupConfig, VoiceLineup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let mut args = std::env::args().skip(1);
    let text = args
        .next()
        .unwrap_or_else(|| "こんにちは、よろしくお願いします。".to_string());
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("voice-lineup.json"));

    let config = LineupConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let lineup = VoiceLineup::new(config)?;

    let tools = lineup.check_tools().await;
    if !tools.ffmpeg_installed {
        bail!(
            "ffmpeg not found at {}",
            lineup.config().ffmpeg_path.display()
        );
    }
    println!(
        "ffmpeg {}",
        tools.ffmpeg_version.as_deref().unwrap_or("(unknown version)")
    );

    let catalog = lineup
        .characters()
        .await
        .context("is the synthesis server running?")?;
    let voices: Vec<(u32, String)> = catalog
        .normal_styles()
        .into_iter()
        .map(|entry| (entry.speaker_id, entry.speaker_name))
        .collect();
    println!("{} speakers selected", voices.len());

    let request = GenerationRequest {
        interval_seconds: 0.5,
        ..GenerationRequest::new(text, voices)
    };

    let (tx, mut progress) = progress_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = progress.next_event().await {
            println!("{:>3}% {}", event.percent, event.status);
        }
    });

    let result = lineup.generate(&request, Some(tx)).await;
    printer.await?;

    let output = result?;
    println!("Wrote {}", output.display());
    Ok(())
}

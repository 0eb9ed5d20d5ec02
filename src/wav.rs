//! Silent waveform synthesis and small WAV helpers

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{LineupError, Result};

/// Sample rate of generated silence, matching VOICEVOX output
pub const SILENCE_SAMPLE_RATE: u32 = 24_000;
pub const SILENCE_BITS_PER_SAMPLE: u16 = 16;
pub const SILENCE_CHANNELS: u16 = 1;

/// Size of the canonical RIFF/WAVE header written for PCM
pub const WAV_HEADER_LEN: usize = 44;

pub fn silence_spec() -> WavSpec {
    WavSpec {
        channels: SILENCE_CHANNELS,
        sample_rate: SILENCE_SAMPLE_RATE,
        bits_per_sample: SILENCE_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// Bytes per frame of generated silence
const SILENCE_BLOCK_ALIGN: u64 = SILENCE_CHANNELS as u64 * (SILENCE_BITS_PER_SAMPLE as u64 / 8);

/// Most frames whose data chunk still fits the 32-bit RIFF size field
pub const MAX_SILENCE_SAMPLES: u64 = (u32::MAX as u64 - 36) / SILENCE_BLOCK_ALIGN;

/// Number of frames in `duration_secs` of silence
pub fn sample_count(duration_secs: f64) -> u64 {
    (SILENCE_SAMPLE_RATE as f64 * duration_secs).round() as u64
}

/// Complete WAV file holding `duration_secs` of silence.
///
/// The header's RIFF size is `36 + data` and the data chunk size is
/// `samples * channels * bytes_per_sample`; every sample byte is zero.
pub fn silent_wav(duration_secs: f64) -> Result<Vec<u8>> {
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(LineupError::InvalidRequest(format!(
            "silence duration must be a non-negative number of seconds, got {}",
            duration_secs
        )));
    }

    let samples = sample_count(duration_secs);
    if samples > MAX_SILENCE_SAMPLES {
        return Err(LineupError::InvalidRequest(format!(
            "silence of {}s does not fit in a WAV file",
            duration_secs
        )));
    }

    let spec = silence_spec();
    let mut cursor = Cursor::new(Vec::with_capacity(
        WAV_HEADER_LEN + (samples * SILENCE_BLOCK_ALIGN) as usize,
    ));

    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for _ in 0..samples * spec.channels as u64 {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Write `duration_secs` of silence to `path`
pub async fn write_silent_wav(path: &Path, duration_secs: f64) -> Result<()> {
    let bytes = silent_wav(duration_secs)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Duration in seconds of an in-memory WAV file
pub fn wav_duration(bytes: &[u8]) -> Result<f64> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn header_sizes_match_payload() {
        for duration in [0.0, 0.25, 1.0, 2.0, 1.23456] {
            let wav = silent_wav(duration).unwrap();
            let data_size = (24_000.0 * duration).round() as usize * 2;

            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(&wav[36..40], b"data");
            assert_eq!(le_u32(&wav, 4) as usize, 36 + data_size);
            assert_eq!(le_u32(&wav, 40) as usize, data_size);
            assert_eq!(wav.len(), WAV_HEADER_LEN + data_size);
        }
    }

    #[test]
    fn payload_is_all_zero() {
        let wav = silent_wav(0.5).unwrap();
        assert!(wav[WAV_HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn output_reads_back_as_mono_16_bit() {
        let wav = silent_wav(1.0).unwrap();
        let reader = WavReader::new(Cursor::new(&wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 24_000);
        assert!((wav_duration(&wav).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_duration_is_rejected() {
        assert!(silent_wav(-1.0).is_err());
        assert!(silent_wav(f64::INFINITY).is_err());
    }

    #[test]
    fn oversized_duration_is_rejected() {
        let fifty_hours = 50.0 * 3600.0;
        assert!(sample_count(fifty_hours) > MAX_SILENCE_SAMPLES);
        assert!(matches!(
            silent_wav(fifty_hours),
            Err(LineupError::InvalidRequest(_))
        ));

        let just_over = (MAX_SILENCE_SAMPLES + 1) as f64 / SILENCE_SAMPLE_RATE as f64;
        assert!(matches!(
            silent_wav(just_over),
            Err(LineupError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gap.wav");
        write_silent_wav(&path, 2.0).await.unwrap();
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 44 + 96_000);
    }
}

//! HTTP client for a VOICEVOX-compatible synthesis server
//!
//! Three endpoints are used:
//! * `GET /speakers` lists speakers and their styles
//! * `POST /audio_query?speaker=<id>&text=<text>` returns synthesis parameters
//! * `POST /synthesis?speaker=<id>` turns those parameters into WAV bytes
//!
//! Anything other than `200 OK` is a hard failure carrying status and body.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::config::LineupConfig;
use crate::error::{LineupError, Result};
use crate::models::Speaker;

/// Synthesis parameters returned by `audio_query`, passed back to `synthesis` untouched
pub type AudioQuery = Value;

/// Capabilities the pipeline needs from a synthesis server
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    /// List speakers and their styles
    async fn speakers(&self) -> Result<Vec<Speaker>>;

    /// Synthesis parameters for `text` spoken by style `speaker`
    async fn audio_query(&self, speaker: u32, text: &str) -> Result<AudioQuery>;

    /// Render synthesis parameters to WAV bytes
    async fn synthesis(&self, speaker: u32, query: &AudioQuery) -> Result<Bytes>;

    /// One full round trip: parameters, then waveform
    async fn synthesize(&self, speaker: u32, text: &str) -> Result<Bytes> {
        let query = self.audio_query(speaker, text).await?;
        self.synthesis(speaker, &query).await
    }
}

/// [`VoiceEngine`] backed by a real server over HTTP
#[derive(Debug, Clone)]
pub struct VoicevoxClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl VoicevoxClient {
    pub fn new(config: &LineupConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base().to_string(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, what: &str, err: reqwest::Error) -> LineupError {
        if err.is_timeout() {
            LineupError::Timeout {
                what: what.to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            LineupError::Http(err)
        }
    }

    /// Turn a non-200 response into [`LineupError::Api`]
    async fn check_status(&self, what: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => format!("Failed to read error response: {}", e),
        };
        log::error!("{} failed with status {}: {}", what, status, body);
        Err(LineupError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl VoiceEngine for VoicevoxClient {
    async fn speakers(&self) -> Result<Vec<Speaker>> {
        const WHAT: &str = "GET /speakers";
        log::debug!("{} -> {}", WHAT, self.base_url);

        let response = self
            .client
            .get(self.url("/speakers"))
            .send()
            .await
            .map_err(|e| self.transport_error(WHAT, e))?;
        let response = self.check_status(WHAT, response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(WHAT, e))?;
        let speakers: Vec<Speaker> = serde_json::from_slice(&body)?;
        log::info!("Synthesis server offers {} speakers", speakers.len());
        Ok(speakers)
    }

    async fn audio_query(&self, speaker: u32, text: &str) -> Result<AudioQuery> {
        const WHAT: &str = "POST /audio_query";
        log::debug!("{} speaker={} text={:?}", WHAT, speaker, text);

        let response = self
            .client
            .post(self.url("/audio_query"))
            .query(&[("speaker", speaker.to_string()), ("text", text.to_string())])
            .send()
            .await
            .map_err(|e| self.transport_error(WHAT, e))?;
        let response = self.check_status(WHAT, response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(WHAT, e))?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn synthesis(&self, speaker: u32, query: &AudioQuery) -> Result<Bytes> {
        const WHAT: &str = "POST /synthesis";
        log::debug!("{} speaker={}", WHAT, speaker);

        let response = self
            .client
            .post(self.url("/synthesis"))
            .query(&[("speaker", speaker.to_string())])
            .json(query)
            .send()
            .await
            .map_err(|e| self.transport_error(WHAT, e))?;
        let response = self.check_status(WHAT, response).await?;

        let wav = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(WHAT, e))?;
        log::debug!("{} returned {} bytes", WHAT, wav.len());
        Ok(wav)
    }
}

//! Data types shared by the pipeline, the catalog and the HTTP client

use serde::{Deserialize, Serialize};

use crate::error::{LineupError, Result};

/// Characters that cannot appear in a file name on at least one desktop OS
const FORBIDDEN_FILE_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// How many characters of the spoken line are used for a derived file name
const BASE_NAME_CHARS: usize = 30;

/// Fallback file name when nothing usable is left
const FALLBACK_BASE_NAME: &str = "output";

/// Style (voice variant) of a speaker as reported by `GET /speakers`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeakerStyle {
    /// Identifier used as `speaker` in synthesis calls
    pub id: u32,
    pub name: String,
}

/// Speaker as reported by `GET /speakers`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Speaker {
    pub name: String,
    #[serde(default)]
    pub speaker_uuid: String,
    #[serde(default)]
    pub styles: Vec<SpeakerStyle>,
}

/// One line of audio to render with several speakers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    /// Line spoken by every selected speaker
    pub text: String,
    /// Style ids in output order; duplicates are allowed
    pub speaker_ids: Vec<u32>,
    /// Display names aligned 1:1 with `speaker_ids`
    pub speaker_names: Vec<String>,
    /// Silence inserted between speakers, in seconds
    pub interval_seconds: f64,
    /// File name (without extension) of the result; derived from `text` when empty
    pub output_base_name: String,
    /// Announce each speaker's name before their take
    pub prepend_name: bool,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            speaker_ids: Vec::new(),
            speaker_names: Vec::new(),
            interval_seconds: 1.0,
            output_base_name: String::new(),
            prepend_name: true,
        }
    }
}

impl GenerationRequest {
    /// Build a request from `(style id, display name)` pairs
    pub fn new<I, S>(text: impl Into<String>, speakers: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let (speaker_ids, speaker_names) = speakers
            .into_iter()
            .map(|(id, name)| (id, name.into()))
            .unzip();
        Self {
            text: text.into(),
            speaker_ids,
            speaker_names,
            ..Self::default()
        }
    }

    /// Check the shape of the request.
    ///
    /// An empty speaker list is deliberately accepted here; the pipeline
    /// reports it as [`LineupError::NoAudioProduced`] when it reaches assembly.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(LineupError::InvalidRequest("text is empty".to_string()));
        }
        if self.speaker_ids.len() != self.speaker_names.len() {
            return Err(LineupError::InvalidRequest(format!(
                "{} speaker ids but {} speaker names",
                self.speaker_ids.len(),
                self.speaker_names.len()
            )));
        }
        if !self.interval_seconds.is_finite() || self.interval_seconds < 0.0 {
            return Err(LineupError::InvalidRequest(format!(
                "interval must be a non-negative number of seconds, got {}",
                self.interval_seconds
            )));
        }
        Ok(())
    }

    /// Number of progress steps a run of this request reports
    pub fn total_steps(&self) -> usize {
        let per_speaker = if self.prepend_name { 3 } else { 1 };
        self.speaker_ids.len() * per_speaker + 1
    }

    /// Display name of the speaker at `index`, `None` past the end of the list
    pub fn speaker_label(&self, index: usize) -> Option<String> {
        let id = *self.speaker_ids.get(index)?;
        let name = self
            .speaker_names
            .get(index)
            .map(String::as_str)
            .unwrap_or_default();
        Some(speaker_label(id, name))
    }

    /// Sanitized file name of the result, without extension
    pub fn file_stem(&self) -> String {
        if self.output_base_name.trim().is_empty() {
            default_base_name(&self.text)
        } else {
            sanitize_file_name(&self.output_base_name)
        }
    }
}

/// `name`, or `ID:<id>` when the name is blank
pub fn speaker_label(id: u32, name: &str) -> String {
    if name.trim().is_empty() {
        format!("ID:{}", id)
    } else {
        name.to_string()
    }
}

/// Replace characters that are not allowed in file names with `_`
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_FILE_NAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.trim().is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        sanitized
    }
}

/// File name derived from the first characters of the spoken line
pub fn default_base_name(text: &str) -> String {
    let head: String = text.chars().take(BASE_NAME_CHARS).collect();
    sanitize_file_name(&head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_count_depends_on_name_prefix() {
        let mut request = GenerationRequest::new("hello", [(1, "a"), (2, "b"), (3, "c")]);
        request.prepend_name = false;
        assert_eq!(request.total_steps(), 4);
        request.prepend_name = true;
        assert_eq!(request.total_steps(), 10);

        let empty = GenerationRequest::new("hello", Vec::<(u32, &str)>::new());
        assert_eq!(empty.total_steps(), 1);
    }

    #[test]
    fn mismatched_names_are_rejected() {
        let mut request = GenerationRequest::new("hello", [(1, "a")]);
        request.speaker_names.push("extra".to_string());
        assert!(matches!(
            request.validate(),
            Err(LineupError::InvalidRequest(_))
        ));
    }

    #[test]
    fn negative_interval_is_rejected() {
        let mut request = GenerationRequest::new("hello", [(1, "a")]);
        request.interval_seconds = -0.5;
        assert!(request.validate().is_err());
        request.interval_seconds = f64::NAN;
        assert!(request.validate().is_err());
        request.interval_seconds = 0.0;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn empty_speaker_list_passes_validation() {
        let request = GenerationRequest::new("hello", Vec::<(u32, &str)>::new());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn blank_names_fall_back_to_id() {
        let request = GenerationRequest::new("hello", [(8, ""), (3, "ずんだもん")]);
        assert_eq!(request.speaker_label(0).as_deref(), Some("ID:8"));
        assert_eq!(request.speaker_label(1).as_deref(), Some("ずんだもん"));
        assert_eq!(request.speaker_label(2), None);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name(r#"a/b\c:d*e?f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_file_name(""), "output");
        assert_eq!(sanitize_file_name("   "), "output");
    }

    #[test]
    fn derived_name_uses_first_thirty_chars() {
        let text = "このアプリは、同じセリフを異なるキャラで比較・聴き比べることを主目的とします。";
        let name = default_base_name(text);
        assert_eq!(name.chars().count(), 30);
        assert!(text.starts_with(&name));

        let request = GenerationRequest::new("what? yes/no", [(1, "a")]);
        assert_eq!(request.file_stem(), "what_ yes_no");
    }

    #[test]
    fn request_deserializes_from_camel_case() {
        let json = r#"{
            "text": "hi",
            "speakerIds": [2, 2],
            "speakerNames": ["四国めたん", "四国めたん"],
            "intervalSeconds": 0.5,
            "prependName": false
        }"#;
        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.speaker_ids, vec![2, 2]);
        assert_eq!(request.interval_seconds, 0.5);
        assert!(!request.prepend_name);
        assert!(request.output_base_name.is_empty());
    }
}

//! Flattened, read-only view of the speakers a synthesis server offers

use serde::{Deserialize, Serialize};

use crate::models::{speaker_label, Speaker};

/// Name the VOICEVOX engine gives to each speaker's default style
pub const NORMAL_STYLE_NAME: &str = "ノーマル";

/// One selectable voice: a style of a speaker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleEntry {
    pub speaker_id: u32,
    pub speaker_name: String,
    pub style_name: String,
}

impl StyleEntry {
    /// Label used when the style is spoken or shown.
    ///
    /// With `include_style` the style name is appended, which is what you want
    /// when several styles of the same speaker are selected at once.
    pub fn display_name(&self, include_style: bool) -> String {
        if include_style {
            format!("{} {}", self.speaker_name, self.style_name)
        } else {
            self.speaker_name.clone()
        }
    }
}

/// Speakers fetched from the server, kept in server order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    speakers: Vec<Speaker>,
}

impl Catalog {
    pub fn new(speakers: Vec<Speaker>) -> Self {
        Self { speakers }
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    /// Every style of every speaker
    pub fn entries(&self) -> Vec<StyleEntry> {
        self.speakers
            .iter()
            .flat_map(|speaker| {
                speaker.styles.iter().map(move |style| StyleEntry {
                    speaker_id: style.id,
                    speaker_name: speaker.name.clone(),
                    style_name: style.name.clone(),
                })
            })
            .collect()
    }

    /// Default style of each speaker, in speaker order
    pub fn normal_styles(&self) -> Vec<StyleEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.style_name == NORMAL_STYLE_NAME)
            .collect()
    }

    pub fn find(&self, style_id: u32) -> Option<StyleEntry> {
        self.speakers.iter().find_map(|speaker| {
            speaker
                .styles
                .iter()
                .find(|style| style.id == style_id)
                .map(|style| StyleEntry {
                    speaker_id: style.id,
                    speaker_name: speaker.name.clone(),
                    style_name: style.name.clone(),
                })
        })
    }

    /// Names aligned 1:1 with `style_ids`, ready for a generation request.
    ///
    /// Unknown ids resolve to `ID:<id>`.
    pub fn display_names(&self, style_ids: &[u32], include_style: bool) -> Vec<String> {
        style_ids
            .iter()
            .map(|&id| match self.find(id) {
                Some(entry) => entry.display_name(include_style),
                None => speaker_label(id, ""),
            })
            .collect()
    }
}

//! Voice catalog: asks the engine for its voice table and turns each row into
//! a human-readable label.

use crate::backends::SpeechEngine;
use crate::error::CatalogError;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_LABELS: &str = include_str!("../data/voice_labels.json");

lazy_static! {
    static ref DEFAULT_LABELS: VoiceLabels =
        serde_json::from_str(BUILTIN_LABELS).expect("built-in voice label table is valid JSON");
}

/// Represents one selectable engine voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub short_name: String,
    pub locale: String,
    pub display_label: String,
}

/// Locale and gender display tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceLabels {
    #[serde(default)]
    pub languages: HashMap<String, String>,
    #[serde(default)]
    pub genders: HashMap<String, String>,
}

impl VoiceLabels {
    pub fn builtin() -> &'static VoiceLabels {
        &DEFAULT_LABELS
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Labels {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| CatalogError::Labels {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn language<'a>(&'a self, locale: &'a str) -> &'a str {
        self.languages.get(locale).map(String::as_str).unwrap_or(locale)
    }

    pub fn gender<'a>(&'a self, token: &'a str) -> &'a str {
        self.genders.get(token).map(String::as_str).unwrap_or(token)
    }
}

/// Parses one row of the engine's voice table.
fn parse_row(line: &str, labels: &VoiceLabels) -> Option<VoiceDescriptor> {
    let mut fields = line.split_whitespace();
    let short_name = fields.next()?;
    let gender = fields.next()?;

    let segments: Vec<&str> = short_name.split('-').collect();
    if segments.len() < 3 {
        return None;
    }
    let locale = format!("{}-{}", segments[0], segments[1]);
    let last = segments[segments.len() - 1];
    let speaker = last.strip_suffix("Neural").unwrap_or(last);

    let display_label = format!(
        "{}-{}-{}",
        labels.language(&locale),
        labels.gender(gender),
        speaker
    );

    Some(VoiceDescriptor {
        short_name: short_name.to_string(),
        locale,
        display_label,
    })
}

/// Parses the engine's tabular voice listing: a header line, a separator
/// line, then one voice per line.
pub fn parse_voice_listing(
    listing: &str,
    labels: &VoiceLabels,
) -> Result<Vec<VoiceDescriptor>, CatalogError> {
    let lines: Vec<&str> = listing.lines().collect();
    if lines.len() < 2 {
        return Err(CatalogError::MalformedListing);
    }

    Ok(lines[2..]
        .iter()
        .filter_map(|line| parse_row(line, labels))
        .collect())
}

/// Queries the engine for its voices.
pub fn list_voices(
    engine: &dyn SpeechEngine,
    labels: &VoiceLabels,
) -> Result<Vec<VoiceDescriptor>, CatalogError> {
    let unavailable = |reason: String| CatalogError::CatalogUnavailable {
        program: engine.id().to_string(),
        reason,
    };

    engine.locate().map_err(|e| unavailable(e.to_string()))?;

    let output = engine
        .run(&engine.list_voices_args())
        .map_err(|e| unavailable(e.to_string()))?;
    if !output.success {
        return Err(unavailable(format!(
            "exit status {:?}: {}",
            output.exit_code,
            output.combined.trim()
        )));
    }

    let voices = parse_voice_listing(&output.combined, labels)?;
    log::info!("Catalog: {} voice(s) from {}", voices.len(), engine.id());
    Ok(voices)
}

/// Finds a voice by engine identifier or by display label.
pub fn find_voice<'a>(voices: &'a [VoiceDescriptor], selection: &str) -> Option<&'a VoiceDescriptor> {
    let selection = selection.trim();
    voices
        .iter()
        .find(|v| v.short_name == selection)
        .or_else(|| voices.iter().find(|v| v.display_label == selection))
}

use crate::error::ValidationError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERCENTAGE: &str = "+0%";

lazy_static! {
    // ASCII digits only: the engine does not accept other numerals.
    static ref SIGNED_PERCENTAGE: Regex =
        Regex::new(r"^[+-][0-9]+%$").expect("signed percentage pattern is valid");
}

/// Voice parameters shared read-only by every item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub voice_id: String,
    pub rate: String,
    pub volume: String,
}

impl SynthesisConfig {
    pub fn new(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            rate: DEFAULT_PERCENTAGE.to_string(),
            volume: DEFAULT_PERCENTAGE.to_string(),
        }
    }

    pub fn with_rate(mut self, rate: impl Into<String>) -> Self {
        self.rate = rate.into();
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = volume.into();
        self
    }
}

/// A request that has passed validation and is safe to hand to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub text: String,
    pub voice_id: String,
    pub rate: String,
    pub volume: String,
}

pub fn is_signed_percentage(value: &str) -> bool {
    SIGNED_PERCENTAGE.is_match(value)
}

/// Normalizes a rate or volume value; blank means `+0%`.
fn normalize_percentage(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        Some(DEFAULT_PERCENTAGE.to_string())
    } else if is_signed_percentage(value) {
        Some(value.to_string())
    } else {
        None
    }
}

/// Validates and normalizes one item against the batch configuration.
pub fn validate(config: &SynthesisConfig, text: &str) -> Result<ValidatedRequest, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let voice_id = config.voice_id.trim();
    if voice_id.is_empty() {
        return Err(ValidationError::MissingVoice);
    }

    let rate = normalize_percentage(&config.rate)
        .ok_or_else(|| ValidationError::InvalidRateFormat(config.rate.trim().to_string()))?;
    let volume = normalize_percentage(&config.volume)
        .ok_or_else(|| ValidationError::InvalidVolumeFormat(config.volume.trim().to_string()))?;

    Ok(ValidatedRequest {
        text: text.to_string(),
        voice_id: voice_id.to_string(),
        rate,
        volume,
    })
}

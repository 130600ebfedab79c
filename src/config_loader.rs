use crate::validator::{is_signed_percentage, SynthesisConfig};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine_binary: String,
    pub voice: String,
    pub rate: String,
    pub volume: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub min_artifact_bytes: u64,
    pub engine_timeout_secs: u64,
    #[serde(default)]
    pub voice_labels_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_binary: "edge-tts".to_string(),
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            rate: "+0%".to_string(),
            volume: "+0%".to_string(),
            max_retries: 10,
            retry_delay_ms: 0,
            min_artifact_bytes: 100,
            engine_timeout_secs: 300,
            voice_labels_path: None,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Loads defaults, then the optional config files, then `explicit` if
    /// given, then `TTS_BATCH_*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("engine_binary", defaults.engine_binary)?
            .set_default("voice", defaults.voice)?
            .set_default("rate", defaults.rate)?
            .set_default("volume", defaults.volume)?
            .set_default("max_retries", defaults.max_retries as i64)?
            .set_default("retry_delay_ms", defaults.retry_delay_ms as i64)?
            .set_default("min_artifact_bytes", defaults.min_artifact_bytes as i64)?
            .set_default("engine_timeout_secs", defaults.engine_timeout_secs as i64)?
            // Merge with local config file (if exists)
            .add_source(File::with_name("TtsBatch").required(false));

        if let Some(config_dir) = dirs::config_dir() {
            builder = builder.add_source(
                File::from(config_dir.join("tts-batch").join("TtsBatch")).required(false),
            );
        }
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        // e.g. TTS_BATCH_MAX_RETRIES=3
        let settings: Settings = builder
            .add_source(config::Environment::with_prefix("TTS_BATCH").try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.engine_binary.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "engine_binary must not be empty".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(config::ConfigError::Message(
                "max_retries must be greater than 0".to_string(),
            ));
        }
        if self.engine_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "engine_timeout_secs must be greater than 0".to_string(),
            ));
        }
        for (key, value) in [("rate", &self.rate), ("volume", &self.volume)] {
            let value = value.trim();
            if !value.is_empty() && !is_signed_percentage(value) {
                return Err(config::ConfigError::Message(format!(
                    "Invalid {}: '{}'. Must look like '+0%' or '-10%'",
                    key, value
                )));
            }
        }
        Ok(())
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig::new(self.voice.clone())
            .with_rate(self.rate.clone())
            .with_volume(self.volume.clone())
    }
}

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::audio::{BYTES_PER_SAMPLE, CHUNK_SECONDS, SAMPLE_RATE};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
}

fn default_model() -> String {
    "base.en".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_use_gpu() -> bool {
    true
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        TranscriptionConfig {
            model: default_model(),
            language: default_language(),
            use_gpu: default_use_gpu(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Nominal chunk duration in seconds; also the scheduler fire period.
    #[serde(default = "default_chunk_seconds")]
    pub chunk_seconds: u64,
}

fn default_chunk_seconds() -> u64 {
    CHUNK_SECONDS as u64
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            chunk_seconds: default_chunk_seconds(),
        }
    }
}

impl PipelineConfig {
    pub fn chunk_period(&self) -> Duration {
        Duration::from_secs(self.chunk_seconds)
    }

    pub fn chunk_bytes(&self) -> usize {
        SAMPLE_RATE * BYTES_PER_SAMPLE * self.chunk_seconds as usize
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            transcription: TranscriptionConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".chunked-transcribe"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.yaml"))
    }

    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Config =
                serde_yaml::from_str(&contents).context("Failed to parse config file")?;

            config.validate()?;

            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            log::info!("created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.chunk_seconds == 0 {
            bail!("chunk_seconds must be greater than 0");
        }
        if self.pipeline.chunk_seconds > 30 {
            bail!("chunk_seconds must be <= 30 (Whisper's window)");
        }

        if self.transcription.model.is_empty() {
            bail!("model name cannot be empty");
        }
        if self.transcription.language.is_empty() {
            bail!("language code cannot be empty");
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        let config_path = Self::config_path()?;
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs::write(&config_path, yaml).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::audio::CHUNK_BYTES;

    #[test]
    fn defaults_match_nominal_chunking() {
        let config = Config::default();
        assert_eq!(config.pipeline.chunk_seconds, 5);
        assert_eq!(config.pipeline.chunk_bytes(), CHUNK_BYTES);
        assert_eq!(config.pipeline.chunk_period(), Duration::from_secs(5));
    }

    #[test]
    fn validate_rejects_zero_chunk_seconds() {
        let mut config = Config::default();
        config.pipeline.chunk_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_model() {
        let mut config = Config::default();
        config.transcription.model = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_yaml_with_defaults() {
        let config: Config = serde_yaml::from_str("pipeline:\n  chunk_seconds: 3\n").unwrap();
        assert_eq!(config.pipeline.chunk_seconds, 3);
        assert_eq!(config.transcription.model, "base.en");
    }
}

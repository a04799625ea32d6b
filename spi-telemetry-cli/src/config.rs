//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spi_telemetry_decoder::DecoderConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub channels: DecoderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Recorded capture to replay
    pub file: Option<PathBuf>,
    /// Maximum bytes per transaction
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Transactions to read (0 = until the capture ends)
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_max_bytes() -> usize {
    2
}

fn default_count() -> usize {
    5000
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            file: None,
            max_bytes: default_max_bytes(),
            count: default_count(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
    /// Print every transaction as it is read
    #[serde(default)]
    pub dump: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .channels
        .validate()
        .with_context(|| format!("Invalid channel configuration in {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spi_telemetry_decoder::{Channel, TypeDescriptor};

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [capture]
            file = "session.spic"
            count = 0

            [output]
            format = "json"

            [channels.channel2]
            type = "SIGNED_16"
            scalefactor = 2
            int_scale_factor = 0.002756342
            unit = "A"

            [channels.channel4]
            type = "UNSIGNED_16_OFFSET"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.capture.file, Some(PathBuf::from("session.spic")));
        assert_eq!(config.capture.count, 0);
        assert_eq!(config.capture.max_bytes, 2);
        assert_eq!(config.output.format, OutputFormat::Json);

        let ch2 = config.channels.channel(Channel::Channel2);
        assert_eq!(ch2.type_descriptor, TypeDescriptor::Signed16);
        assert_eq!(ch2.scalefactor, 2);
        assert_eq!(ch2.unit.as_deref(), Some("A"));

        let ch4 = config.channels.channel(Channel::Channel4);
        assert_eq!(ch4.type_descriptor, TypeDescriptor::Unsigned16Offset);
        assert_eq!(ch4.scalefactor, 0);
        assert_eq!(ch4.int_scale_factor, 1.0);

        // Untouched channels keep the standard profile
        assert_eq!(
            config.channels.channel(Channel::Channel1),
            DecoderConfig::default().channel(Channel::Channel1)
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.capture.count, 5000);
        assert_eq!(config.output.format, OutputFormat::Txt);
        assert!(!config.output.dump);
        assert_eq!(config.channels, DecoderConfig::default());
    }

    #[test]
    fn test_example_config_parses() {
        let config: AppConfig = toml::from_str(include_str!("../config.example.toml")).unwrap();
        assert!(config.output.dump);
        assert_eq!(config.capture.count, 0);
        assert!(config.channels.validate().is_ok());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let toml_content = r#"
            [channels.channel1]
            type = "FLOAT_32"
        "#;
        assert!(toml::from_str::<AppConfig>(toml_content).is_err());
    }
}

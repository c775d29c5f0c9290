//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::encoder::CodecRegistry;

pub mod types;

pub use types::{CaptureConfig, EncoderSection, LoggingConfig, OutputConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Encoder configuration
    #[serde(default)]
    pub encoder: EncoderSection,
    /// Capture source configuration
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command-line overrides applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Codec name
    pub codec: Option<String>,
    /// Input file
    pub input: Option<PathBuf>,
    /// Output file
    pub output: Option<PathBuf>,
    /// Frame width
    pub width: Option<i32>,
    /// Frame height
    pub height: Option<i32>,
    /// Frame count
    pub frames: Option<u64>,
    /// Bit rate in bits per second
    pub bitrate: Option<u32>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let registry = CodecRegistry::with_defaults();
        let codec = self.encoder.codec_id();
        if !registry.contains(&codec) {
            let available: Vec<String> =
                registry.available().iter().map(|id| id.to_string()).collect();
            anyhow::bail!(
                "Invalid codec: {} (available: {})",
                codec,
                available.join(", ")
            );
        }

        if self.capture.width <= 0 || self.capture.height <= 0 {
            anyhow::bail!(
                "Invalid capture size: {}x{}",
                self.capture.width,
                self.capture.height
            );
        }
        if self.capture.width % 2 != 0 || self.capture.height % 2 != 0 {
            anyhow::bail!(
                "Capture size must be even for 4:2:0: {}x{}",
                self.capture.width,
                self.capture.height
            );
        }

        if self.encoder.bitrate == 0 {
            anyhow::bail!("bitrate must be positive");
        }
        if self.encoder.fps == 0 || self.encoder.fps > 240 {
            anyhow::bail!("fps must be between 1 and 240, got {}", self.encoder.fps);
        }
        if self.encoder.ticks_per_frame == 0 {
            anyhow::bail!("ticks_per_frame must be positive");
        }
        if self.encoder.gop_size == 0 {
            anyhow::bail!("gop_size must be positive");
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        if let Some(input) = &self.capture.input {
            if !input.exists() {
                anyhow::bail!("Input file not found: {:?}", input);
            }
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(codec) = overrides.codec {
            self.encoder.codec = codec;
        }
        if let Some(input) = overrides.input {
            self.capture.input = Some(input);
        }
        if let Some(output) = overrides.output {
            self.output.path = output;
        }
        if let Some(width) = overrides.width {
            self.capture.width = width;
        }
        if let Some(height) = overrides.height {
            self.capture.height = height;
        }
        if let Some(frames) = overrides.frames {
            self.capture.frames = frames;
        }
        if let Some(bitrate) = overrides.bitrate {
            self.encoder.bitrate = bitrate;
        }

        self
    }
}

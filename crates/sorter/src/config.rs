use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::MIN_DURATION_MICROS;

/// Configuration for a sorting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    /// Path to the ffprobe binary (resolved through PATH when relative)
    pub ffprobe_bin: PathBuf,
    /// Single root for the category directories; `None` sorts next to each file
    pub destination_root: Option<PathBuf>,
    /// Videos strictly shorter than this are left in place
    pub min_duration_micros: u64,
    /// Swap width/height for streams rotated by 90 or 270 degrees
    pub apply_rotation: bool,
    /// Sort images into Portrait/Landscape from their pixel dimensions instead of Image
    pub image_orientation: bool,
    /// Descend into subdirectories of directory arguments
    pub recursive: bool,
    /// Number of files probed concurrently (1 = sequential)
    pub jobs: usize,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl SorterConfig {
    /// Create a default configuration with sensible values
    pub fn default_config() -> Self {
        Self {
            ffprobe_bin: PathBuf::from("ffprobe"),
            destination_root: None,
            min_duration_micros: MIN_DURATION_MICROS,
            apply_rotation: true,
            image_orientation: false,
            recursive: false,
            jobs: 1,
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    config = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                } else {
                    config = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                }
            }
        }

        // jobs = 0 would stall the stream; treat it as sequential
        if config.jobs == 0 {
            config.jobs = 1;
        }

        Ok(config)
    }
}

//! Configuration file management for cascade.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory. Every field carries a
//! serde default so a partial (or empty) file parses into a usable configuration.

use anyhow::{anyhow, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// How history strips are colored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Map vertex height to an HSV hue, dimming with depth
    #[default]
    Hue,
    /// Single configured color for every strip
    Uniform,
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hue => write!(f, "hue"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

/// Audio capture and spectrum analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `cascade list-devices`
    /// - device name from `cascade list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested sample rate in Hz (actual rate follows the device)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// FFT size in samples (must be a power of two)
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Lower bound of the displayed frequency window in Hz
    #[serde(default)]
    pub min_freq_hz: f32,
    /// Upper bound of the displayed frequency window in Hz
    #[serde(default = "default_max_freq_hz")]
    pub max_freq_hz: f32,
    /// Reference level in dBFS mapped to full strip height (typical: -20 to -6 dBFS)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            fft_size: default_fft_size(),
            min_freq_hz: 0.0,
            max_freq_hz: default_max_freq_hz(),
            reference_level_db: default_reference_level_db(),
        }
    }
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_fft_size() -> usize {
    1024
}

fn default_max_freq_hz() -> f32 {
    5000.0
}

fn default_reference_level_db() -> i8 {
    -20
}

/// Rendering style toggles, also switchable at runtime from the keyboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderStyle {
    /// Draw the line strip layer
    #[serde(default = "default_true")]
    pub line: bool,
    /// Draw the filled ribbon layer beneath the lines
    #[serde(default = "default_true")]
    pub ribbon: bool,
    /// Coloring scheme for both layers
    #[serde(default)]
    pub color_mode: ColorMode,
    /// RGB color used when `color_mode = "uniform"`
    #[serde(default = "default_uniform_color")]
    pub uniform_color: [u8; 3],
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            line: true,
            ribbon: true,
            color_mode: ColorMode::default(),
            uniform_color: default_uniform_color(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_uniform_color() -> [u8; 3] {
    [206, 224, 220]
}

/// Waterfall history and animation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallConfig {
    /// Number of history strips kept on screen
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// How often a new spectrum strip is admitted into history, in Hz
    #[serde(default = "default_admission_hz")]
    pub admission_hz: f64,
    #[serde(default)]
    pub style: RenderStyle,
}

impl Default for WaterfallConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            admission_hz: default_admission_hz(),
            style: RenderStyle::default(),
        }
    }
}

fn default_capacity() -> usize {
    50
}

fn default_admission_hz() -> f64 {
    15.0
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub waterfall: WaterfallConfig,
}

impl CascadeConfig {
    /// Loads configuration from the user's config directory, writing a default
    /// config file first if none exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed or fails validation
    pub fn load_or_init() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            let config = CascadeConfig::default();
            config.save()?;
            tracing::info!("Default configuration written to {}", config_path.display());
            return Ok(config);
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: CascadeConfig = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }

    /// Checks configuration values that would otherwise fail deep inside the
    /// pipeline, so a bad file is rejected with a readable message at startup.
    ///
    /// # Errors
    /// - If any value falls outside its documented range
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.waterfall.capacity >= 1,
            "waterfall.capacity must be at least 1 (got {})",
            self.waterfall.capacity
        );
        ensure!(
            self.waterfall.admission_hz > 0.0 && self.waterfall.admission_hz.is_finite(),
            "waterfall.admission_hz must be a positive number (got {})",
            self.waterfall.admission_hz
        );
        ensure!(
            self.audio.fft_size >= 32 && self.audio.fft_size.is_power_of_two(),
            "audio.fft_size must be a power of two >= 32 (got {})",
            self.audio.fft_size
        );
        ensure!(
            self.audio.min_freq_hz >= 0.0 && self.audio.min_freq_hz < self.audio.max_freq_hz,
            "audio frequency window must satisfy 0 <= min_freq_hz < max_freq_hz (got {}..{})",
            self.audio.min_freq_hz,
            self.audio.max_freq_hz
        );
        Ok(())
    }
}

/// Retrieves the path to the config file, creating the config directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .join(".config")
        .join("cascade");

    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir.join("cascade.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let config: CascadeConfig = toml::from_str("").unwrap();
        assert_eq!(config.waterfall.capacity, 50);
        assert_eq!(config.waterfall.admission_hz, 15.0);
        assert_eq!(config.audio.fft_size, 1024);
        assert_eq!(config.audio.max_freq_hz, 5000.0);
        assert!(config.waterfall.style.line);
        assert!(config.waterfall.style.ribbon);
        assert_eq!(config.waterfall.style.color_mode, ColorMode::Hue);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: CascadeConfig = toml::from_str(
            r#"
            [waterfall]
            capacity = 30

            [waterfall.style]
            color_mode = "uniform"
            "#,
        )
        .unwrap();
        assert_eq!(config.waterfall.capacity, 30);
        assert_eq!(config.waterfall.admission_hz, 15.0);
        assert_eq!(config.waterfall.style.color_mode, ColorMode::Uniform);
        assert!(config.waterfall.style.line);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CascadeConfig::default();
        config.waterfall.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = CascadeConfig::default();
        config.waterfall.admission_hz = 0.0;
        assert!(config.validate().is_err());

        let mut config = CascadeConfig::default();
        config.audio.fft_size = 1000;
        assert!(config.validate().is_err());

        let mut config = CascadeConfig::default();
        config.audio.min_freq_hz = 6000.0;
        assert!(config.validate().is_err());
    }
}

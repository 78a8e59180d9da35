// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::core::{
    DEFAULT_AUDIO_BITRATE_K, DEFAULT_CRF, DEFAULT_GRACE_PERIOD_MS, DEFAULT_PRESET,
    DEFAULT_PROGRESS_WINDOW, EncodingSettings, Resolution,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub startup: StartupConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub process: ProcessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    /// Whether to automatically start encoding when the TUI launches with
    /// scanned files
    #[serde(default)]
    pub autostart: bool,

    /// Whether to scan the launch folder for videos (or start with an
    /// empty dashboard)
    #[serde(default = "default_scan_on_launch")]
    pub scan_on_launch: bool,
}

/// Initial encoder settings; every field can be changed in the TUI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Target resolution label: source, HD, FHD, or 4K
    #[serde(default = "default_resolution")]
    pub resolution: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_preset")]
    pub preset: String,

    /// Encode with NVENC when the host supports it
    #[serde(default)]
    pub use_gpu: bool,

    #[serde(default = "default_audio_bitrate_k")]
    pub audio_bitrate_k: u32,

    /// libx264 worker threads, 0 lets ffmpeg decide
    #[serde(default)]
    pub threads: u32,

    /// Extra ffmpeg arguments appended to every encode, shell-quoted
    #[serde(default)]
    pub extra_args: String,
}

/// Knobs for how child processes are supervised
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// How long a cancelled ffmpeg gets to exit before it is killed
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Sample count for the rolling frame-rate average
    #[serde(default = "default_progress_window")]
    pub progress_window: usize,
}

fn default_scan_on_launch() -> bool {
    true
}

fn default_resolution() -> String {
    "source".to_string()
}

fn default_crf() -> u32 {
    DEFAULT_CRF
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}

fn default_audio_bitrate_k() -> u32 {
    DEFAULT_AUDIO_BITRATE_K
}

fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}

fn default_progress_window() -> usize {
    DEFAULT_PROGRESS_WINDOW
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            autostart: false,
            scan_on_launch: default_scan_on_launch(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            crf: default_crf(),
            preset: default_preset(),
            use_gpu: false,
            audio_bitrate_k: default_audio_bitrate_k(),
            threads: 0,
            extra_args: String::new(),
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            progress_window: default_progress_window(),
        }
    }
}

impl ProcessConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("vidscale")
        } else if cfg!(target_os = "windows") {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("vidscale")
        } else {
            // Linux and others
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("vidscale")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            let config: Config = toml::from_str(&contents).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;

            Ok(config)
        } else {
            // Create default config and save it
            let config = Config::default();

            // Try to save the default config, but don't fail if we can't
            // (e.g., if the directory isn't writable)
            if let Err(e) = config.save() {
                eprintln!("Warning: Could not create default config file: {}", e);
                eprintln!(
                    "Using built-in defaults. Run 'vidscale init-config' to create a config file."
                );
            }

            Ok(config)
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Create a default config file if it doesn't exist
    pub fn ensure_default() -> Result<()> {
        if !Self::exists() {
            let config = Config::default();
            config.save()?;
        }
        Ok(())
    }

    /// Encoder settings seeded from the [defaults] table.
    ///
    /// An unrecognized resolution label falls back to source rather than
    /// failing the whole config.
    pub fn encoding_settings(&self) -> EncodingSettings {
        let resolution = Resolution::parse(&self.defaults.resolution).unwrap_or_default();
        let mut settings = EncodingSettings::default().with_resolution(resolution);
        settings.crf = self.defaults.crf;
        settings.preset = self.defaults.preset.clone();
        settings.use_gpu = self.defaults.use_gpu;
        settings.audio_bitrate_k = self.defaults.audio_bitrate_k;
        settings.threads = self.defaults.threads;
        settings.extra_args = self.defaults.extra_args.clone();
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.startup.autostart, false);
        assert_eq!(config.startup.scan_on_launch, true);
        assert_eq!(config.defaults.resolution, "source");
        assert_eq!(config.defaults.crf, 26);
        assert_eq!(config.defaults.preset, "medium");
        assert_eq!(config.defaults.use_gpu, false);
        assert_eq!(config.process.grace_period_ms, 5000);
        assert_eq!(config.process.progress_window, 50);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be able to deserialize back
        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.startup.autostart, config.startup.autostart);
        assert_eq!(deserialized.defaults.crf, config.defaults.crf);
        assert_eq!(
            deserialized.process.grace_period_ms,
            config.process.grace_period_ms
        );
    }

    #[test]
    fn test_partial_config_fills_missing_fields() {
        // A config written by an older version only has some keys
        let toml_str = r#"
            [defaults]
            crf = 21
            use_gpu = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.defaults.crf, 21);
        assert!(config.defaults.use_gpu);
        assert_eq!(config.defaults.preset, "medium");
        assert_eq!(config.defaults.resolution, "source");
        assert_eq!(config.process.grace_period_ms, 5000);
        assert!(config.startup.scan_on_launch);
    }

    #[test]
    fn test_encoding_settings_from_defaults() {
        let mut config = Config::default();
        config.defaults.resolution = "FHD".to_string();
        config.defaults.crf = 23;
        config.defaults.use_gpu = true;

        let settings = config.encoding_settings();
        assert_eq!(settings.width, 1920);
        assert_eq!(settings.height, 1080);
        assert_eq!(settings.crf, 23);
        assert!(settings.use_gpu);
    }

    #[test]
    fn test_unknown_resolution_label_falls_back_to_source() {
        let mut config = Config::default();
        config.defaults.resolution = "8K".to_string();

        let settings = config.encoding_settings();
        assert_eq!(settings.scale_dimensions(), None);
    }

    #[test]
    fn test_grace_period_conversion() {
        let mut config = Config::default();
        config.process.grace_period_ms = 250;
        assert_eq!(config.process.grace_period(), Duration::from_millis(250));
    }
}

//! TOML configuration file loading
//!
//! Supports `~/.config/voice-arcade/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Microphone configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Gameplay configuration
    #[serde(default)]
    pub game: GameFileConfig,

    /// Where logs are written
    pub data_dir: Option<String>,
}

/// Microphone configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Input device index as listed by `voice-arcade devices`
    pub device: Option<usize>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// "whisper" or "deepgram"
    pub provider: Option<String>,

    /// Provider model (e.g. "whisper-1", "nova-2")
    pub model: Option<String>,

    pub api_key: Option<String>,

    /// ISO 639-1 language code
    pub language: Option<String>,
}

/// Gameplay configuration
#[derive(Debug, Default, Deserialize)]
pub struct GameFileConfig {
    /// Fixed RNG seed for reproducible courses
    pub seed: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-arcade/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-arcade").join("config.toml"))
}

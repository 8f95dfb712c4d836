//! Configuration management for voice-arcade
//!
//! Layers, lowest priority first: built-in defaults, the TOML file,
//! environment variables, then command-line flags (applied by the binary).

pub mod file;

use std::path::PathBuf;

use crate::voice::{SpeechToText, SttProvider};
use crate::{Error, Result};

/// Language used for command recognition when none is configured
pub const DEFAULT_LANGUAGE: &str = "pt";

/// voice-arcade configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Input device index (`None` = host default)
    pub device: Option<usize>,

    /// Speech recognition configuration
    pub speech: SpeechConfig,

    /// Fixed RNG seed for reproducible courses
    pub seed: Option<u64>,

    /// Path to data directory (log file)
    pub data_dir: PathBuf,
}

/// Speech recognition configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    pub provider: SttProvider,

    /// Provider model (e.g. "whisper-1", "nova-2")
    pub model: String,

    /// Key for the selected provider
    pub api_key: Option<String>,

    /// ISO 639-1 code passed to the recognizer
    pub language: String,
}

impl Config {
    /// Load configuration from the default file and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if an environment variable or file value is invalid
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit file path and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if an environment variable or file value is invalid
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        Self::from_sources(file::load_config_from(path), |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with environment lookups
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    pub fn from_sources(
        fc: file::ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let device = match env("VOICE_ARCADE_DEVICE") {
            Some(raw) => Some(parse_env("VOICE_ARCADE_DEVICE", &raw)?),
            None => fc.audio.device,
        };

        let provider = env("VOICE_ARCADE_STT_PROVIDER")
            .or(fc.speech.provider)
            .map(|p| p.parse::<SttProvider>())
            .transpose()?
            .unwrap_or_default();

        let model = env("VOICE_ARCADE_STT_MODEL")
            .or(fc.speech.model)
            .unwrap_or_else(|| provider.default_model().to_string());

        let provider_key = match provider {
            SttProvider::Whisper => env("OPENAI_API_KEY"),
            SttProvider::Deepgram => env("DEEPGRAM_API_KEY"),
        };
        let api_key = env("VOICE_ARCADE_API_KEY")
            .or(provider_key)
            .or(fc.speech.api_key)
            .filter(|k| !k.is_empty());

        let language = env("VOICE_ARCADE_LANGUAGE")
            .or(fc.speech.language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let seed = match env("VOICE_ARCADE_SEED") {
            Some(raw) => Some(parse_env("VOICE_ARCADE_SEED", &raw)?),
            None => fc.game.seed,
        };

        // ~/.local/share/voice-arcade on Linux
        let data_dir = env("VOICE_ARCADE_DATA_DIR")
            .or(fc.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        Ok(Self {
            device,
            speech: SpeechConfig {
                provider,
                model,
                api_key,
                language,
            },
            seed,
            data_dir,
        })
    }

    /// Build the speech-to-text client for the configured provider
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured
    pub fn speech_to_text(&self) -> Result<SpeechToText> {
        let api_key = self.speech.api_key.clone().ok_or_else(|| {
            Error::Config(format!(
                "no API key for {:?}; set {} or VOICE_ARCADE_API_KEY",
                self.speech.provider,
                match self.speech.provider {
                    SttProvider::Whisper => "OPENAI_API_KEY",
                    SttProvider::Deepgram => "DEEPGRAM_API_KEY",
                }
            ))
        })?;
        SpeechToText::new(self.speech.provider, api_key, self.speech.model.clone())
    }

    /// Path of the interactive game's log file
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("voice-arcade.log")
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("voice-arcade"))
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {key}: {raw:?}")))
}

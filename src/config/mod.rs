//! Configuration management for the interview gateway
//!
//! The configuration is a small secret bundle: the Gemini API key, the
//! database location, and the ElevenLabs API key. It is persisted as an
//! owner-only JSON file and can be replaced at runtime via `POST /api/config`.

pub mod file;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::voice::tts::{DEFAULT_MODEL_ID, DEFAULT_VOICE_ID};

/// Gateway configuration
///
/// Wire format is camelCase to match the web client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gemini API key for question generation and scoring
    #[serde(default)]
    pub gemini_api_key: String,

    /// Storage location for the session/profile database
    #[serde(default)]
    pub database_url: String,

    /// ElevenLabs API key for speech synthesis
    #[serde(default)]
    pub eleven_labs_api_key: String,

    /// Voice synthesis overrides
    #[serde(default)]
    pub voice: VoiceConfig,
}

/// Voice synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// ElevenLabs voice identifier
    #[serde(default = "default_voice_id")]
    pub tts_voice: String,

    /// ElevenLabs model identifier
    #[serde(default = "default_model_id")]
    pub tts_model: String,
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            tts_voice: default_voice_id(),
            tts_model: default_model_id(),
        }
    }
}

impl Config {
    /// Names of required fields that are missing or empty
    ///
    /// Every name here corresponds to a camelCase wire field, so the list
    /// can be surfaced directly in a 400 response.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini_api_key.trim().is_empty() {
            missing.push("geminiApiKey");
        }
        if self.database_url.trim().is_empty() {
            missing.push("databaseUrl");
        }
        if self.eleven_labs_api_key.trim().is_empty() {
            missing.push("elevenLabsApiKey");
        }
        missing
    }

    /// Explicit readiness check: all required fields present
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Build a configuration from environment variables
    ///
    /// Returns `None` unless `GEMINI_API_KEY` and `ELEVENLABS_API_KEY` are
    /// both set. `DATABASE_URL` is optional and defaults to the standard
    /// data directory.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok()?;
        let eleven_labs_api_key = std::env::var("ELEVENLABS_API_KEY").ok()?;
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .unwrap_or_else(|| default_database_path().display().to_string());

        Some(Self {
            gemini_api_key,
            database_url,
            eleven_labs_api_key,
            voice: VoiceConfig::default(),
        })
    }

    /// Resolve the database URL to a filesystem path
    ///
    /// Accepts a plain path or a `sqlite://` prefixed URL.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        let url = self.database_url.trim();
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        PathBuf::from(path)
    }
}

/// Default database path under the user data directory
#[must_use]
pub fn default_database_path() -> PathBuf {
    data_dir().join("interview.db")
}

/// Data directory for the gateway (database, cached audio)
#[must_use]
pub fn data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".interview-gateway"),
        |d| d.data_dir().join("interview-gateway"),
    )
}

/// Load configuration from the given path, falling back to the environment
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_or_env(path: &Path) -> crate::Result<Option<Config>> {
    if let Some(config) = file::load(path)? {
        return Ok(Some(config));
    }
    Ok(Config::from_env())
}

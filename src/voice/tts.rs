//! Text-to-speech via ElevenLabs

use serde::Serialize;

use crate::{Error, Result};

/// Default ElevenLabs voice ("Rachel")
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default ElevenLabs model
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Synthesizes interviewer speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

impl TextToSpeech {
    /// Create a new TTS instance with the default voice and model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_voice(api_key, DEFAULT_VOICE_ID.to_string(), DEFAULT_MODEL_ID.to_string())
    }

    /// Create a new TTS instance with a custom voice and model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn with_voice(api_key: String, voice_id: String, model_id: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id,
            model_id,
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            self.voice_id
        );

        let request = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(TextToSpeech::new(String::new()).is_err());
    }

    #[test]
    fn test_custom_voice_accepted() {
        let tts = TextToSpeech::with_voice(
            "key".to_string(),
            "voice".to_string(),
            "model".to_string(),
        )
        .unwrap();
        assert_eq!(tts.voice_id, "voice");
    }
}

//! Voice processing module
//!
//! Handles microphone capture for spoken answers, speech synthesis via
//! ElevenLabs, and playback of the interviewer's voice.

pub mod capture;
pub mod playback;
pub mod tts;

use async_trait::async_trait;

use crate::flow::Voice;
use crate::Result;

pub use capture::{samples_to_wav, AnswerRecorder, CAPTURE_SAMPLE_RATE};
pub use playback::AudioPlayback;
pub use tts::{TextToSpeech, DEFAULT_MODEL_ID, DEFAULT_VOICE_ID};

/// Speaks through the local output device: synthesizes with ElevenLabs and
/// blocks until playback has fully drained
pub struct Speaker {
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl Speaker {
    /// Create a speaker from a TTS client and an opened output device
    #[must_use]
    pub fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self { tts, playback }
    }
}

#[async_trait]
impl Voice for Speaker {
    async fn say(&mut self, text: &str) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;
        self.playback.play_mp3(&audio).await
    }
}

// Speech synthesis module
// The orchestrator only sees the SpeechSynthesizer trait; the Gemini client
// is the production implementation behind it

pub mod gemini;
pub mod voices;

pub use gemini::GeminiClient;
pub use voices::VoiceName;

use async_trait::async_trait;

use crate::error::AppResult;

/// Sample rate of the PCM audio returned by the speech service.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// The speech service returns mono audio.
pub const SPEECH_CHANNELS: u16 = 1;

/// A text-to-speech backend.
///
/// Returns the synthesized audio as a base64 string of raw 16-bit PCM at
/// [`SPEECH_SAMPLE_RATE`]. Failures carry a human-readable message that is
/// surfaced to the user as-is; callers do not retry.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: VoiceName) -> AppResult<String>;
}

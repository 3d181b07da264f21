// Application session state
// One shared state struct, mutated only through explicit transitions so the
// generate/playback flow stays testable without a window

use std::sync::{Arc, Mutex};

use crate::audio::{codec, AudioClip};
use crate::error::AppResult;
use crate::speech::{SpeechSynthesizer, VoiceName, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};

/// Shared application state for one generation/playback cycle.
pub struct Session {
    /// Script text of the most recent generation request.
    pub text: String,
    /// Voice used for the most recent generation request.
    pub voice: VoiceName,
    pub is_generating: bool,
    pub last_error: Option<String>,
    /// Raw 16-bit PCM bytes of the current clip.
    pub pcm: Option<Arc<Vec<u8>>>,
    /// WAV container bytes kept around for download.
    pub wav: Option<Arc<Vec<u8>>>,
}

impl Session {
    pub fn new(voice: VoiceName) -> Self {
        Self {
            text: String::new(),
            voice,
            is_generating: false,
            last_error: None,
            pcm: None,
            wav: None,
        }
    }

    /// Mark a generation as started. Refuses if one is already in flight;
    /// the UI disables the trigger, this is the second line of defense.
    pub fn begin_generation(&mut self) -> bool {
        if self.is_generating {
            return false;
        }
        self.is_generating = true;
        self.last_error = None;
        true
    }

    /// Store a freshly generated clip, replacing the previous pair.
    pub fn complete_generation(
        &mut self,
        text: String,
        voice: VoiceName,
        pcm: Arc<Vec<u8>>,
        wav: Arc<Vec<u8>>,
    ) {
        self.text = text;
        self.voice = voice;
        self.pcm = Some(pcm);
        self.wav = Some(wav);
        self.is_generating = false;
    }

    /// Record a failed generation. Previously generated audio is kept.
    pub fn fail_generation(&mut self, message: impl Into<String>) {
        self.is_generating = false;
        self.last_error = Some(message.into());
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn has_audio(&self) -> bool {
        self.wav.is_some()
    }
}

/// Run one generation: synthesize, decode the payload, store the PCM/WAV
/// pair. Returns the decoded clip on success so the caller can auto-play
/// it. All failures land in `Session::last_error`.
pub async fn run_generation(
    synthesizer: &dyn SpeechSynthesizer,
    session: &Mutex<Session>,
    text: &str,
    voice: VoiceName,
) -> Option<Arc<AudioClip>> {
    {
        let mut session = session.lock().unwrap();
        if !session.begin_generation() {
            log::warn!("generation already in flight, ignoring trigger");
            return None;
        }
    }

    let result = match synthesizer.synthesize(text, voice).await {
        Ok(payload) => decode_generation(&payload),
        Err(e) => Err(e),
    };

    let mut session = session.lock().unwrap();
    match result {
        Ok((clip, pcm, wav)) => {
            log::info!(
                "generated {:.2}s of audio ({} bytes)",
                clip.duration_secs(),
                pcm.len()
            );
            session.complete_generation(text.to_string(), voice, pcm, wav);
            Some(Arc::new(clip))
        }
        Err(e) => {
            log::error!("speech generation failed: {}", e);
            session.fail_generation(e.to_string());
            None
        }
    }
}

type DecodedGeneration = (AudioClip, Arc<Vec<u8>>, Arc<Vec<u8>>);

fn decode_generation(payload: &str) -> AppResult<DecodedGeneration> {
    let bytes = codec::decode_base64(payload)?;
    let clip = codec::decode_pcm16(&bytes, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS);
    let wav = codec::wav_bytes(&bytes, SPEECH_SAMPLE_RATE)?;
    Ok((clip, Arc::new(bytes), Arc::new(wav)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;

    struct FixedSynthesizer {
        payload: String,
    }

    #[async_trait]
    impl SpeechSynthesizer for FixedSynthesizer {
        async fn synthesize(&self, _text: &str, _voice: VoiceName) -> AppResult<String> {
            Ok(self.payload.clone())
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for FailingSynthesizer {
        async fn synthesize(&self, _text: &str, _voice: VoiceName) -> AppResult<String> {
            Err(AppError::Upstream("no audio data in response".to_string()))
        }
    }

    fn pcm_fixture() -> Vec<u8> {
        (0..100i16).flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_begin_generation_clears_error_and_refuses_reentry() {
        let mut session = Session::new(VoiceName::Charon);
        session.last_error = Some("old failure".to_string());

        assert!(session.begin_generation());
        assert!(session.is_generating);
        assert!(session.last_error.is_none());

        assert!(!session.begin_generation());
    }

    #[tokio::test]
    async fn test_successful_generation_stores_audio_and_returns_clip() {
        let pcm = pcm_fixture();
        let synthesizer = FixedSynthesizer {
            payload: BASE64.encode(&pcm),
        };
        let session = Mutex::new(Session::new(VoiceName::Charon));

        let clip = run_generation(&synthesizer, &session, "hello", VoiceName::Kore)
            .await
            .expect("generation should yield a clip");

        assert_eq!(clip.samples.len(), pcm.len() / 2);
        assert_eq!(clip.sample_rate, SPEECH_SAMPLE_RATE);

        let session = session.lock().unwrap();
        assert!(!session.is_generating);
        assert!(session.last_error.is_none());
        assert_eq!(session.text, "hello");
        assert_eq!(session.voice, VoiceName::Kore);
        assert_eq!(session.pcm.as_deref(), Some(&pcm));
        let wav = session.wav.as_ref().expect("wav blob stored");
        assert_eq!(wav.len(), 44 + pcm.len());
    }

    #[tokio::test]
    async fn test_failed_generation_sets_error_and_keeps_previous_audio() {
        let session = Mutex::new(Session::new(VoiceName::Charon));
        let previous_pcm = Arc::new(pcm_fixture());
        let previous_wav = Arc::new(vec![1u8, 2, 3]);
        session.lock().unwrap().complete_generation(
            "earlier".to_string(),
            VoiceName::Charon,
            previous_pcm.clone(),
            previous_wav.clone(),
        );

        let clip = run_generation(&FailingSynthesizer, &session, "again", VoiceName::Charon).await;
        assert!(clip.is_none());

        let session = session.lock().unwrap();
        assert!(!session.is_generating);
        assert!(session
            .last_error
            .as_deref()
            .unwrap()
            .contains("no audio data in response"));
        // The old clip is still available for playback and download.
        assert!(Arc::ptr_eq(session.pcm.as_ref().unwrap(), &previous_pcm));
        assert!(Arc::ptr_eq(session.wav.as_ref().unwrap(), &previous_wav));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_decode_failure() {
        let synthesizer = FixedSynthesizer {
            payload: "*** not base64 ***".to_string(),
        };
        let session = Mutex::new(Session::new(VoiceName::Charon));

        let clip = run_generation(&synthesizer, &session, "hello", VoiceName::Charon).await;
        assert!(clip.is_none());

        let session = session.lock().unwrap();
        assert!(!session.is_generating);
        assert!(session.last_error.as_deref().unwrap().contains("decode"));
        assert!(!session.has_audio());
    }

    #[tokio::test]
    async fn test_generation_refused_while_one_is_in_flight() {
        let pcm = pcm_fixture();
        let synthesizer = FixedSynthesizer {
            payload: BASE64.encode(&pcm),
        };
        let session = Mutex::new(Session::new(VoiceName::Charon));
        session.lock().unwrap().is_generating = true;

        let clip = run_generation(&synthesizer, &session, "hello", VoiceName::Charon).await;
        assert!(clip.is_none());
        assert!(session.lock().unwrap().is_generating);
    }
}

// Gemini speech synthesis client
// One REST call per generation; the whole clip comes back as inline base64 PCM

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::speech::{SpeechSynthesizer, VoiceName};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Client for the Gemini speech generation endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str, voice: VoiceName) -> AppResult<String> {
        log::info!("requesting speech synthesis with voice {}", voice);

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", API_BASE, SPEECH_MODEL))
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{ "parts": [{ "text": text }] }],
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {
                            "prebuiltVoiceConfig": { "voiceName": voice.as_str() }
                        }
                    }
                }
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("speech request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("speech service returned {}: {}", status, body);
            return Err(AppError::Upstream(format!(
                "speech service returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed speech response: {}", e)))?;

        extract_audio(&parsed)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: String,
}

/// Pull the base64 audio payload out of the first candidate that has one.
fn extract_audio(response: &GenerateContentResponse) -> AppResult<String> {
    response
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .find_map(|part| part.inline_data.as_ref())
        .map(|inline| inline.data.clone())
        .ok_or_else(|| AppError::Upstream("no audio data in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_inline_audio_payload() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "audio/L16;codec=pcm;rate=24000",
                            "data": "AAECAw=="
                        }
                    }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-2.5-flash-preview-tts"
        }"#;

        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_audio(&parsed).unwrap(), "AAECAw==");
    }

    #[test]
    fn test_skips_text_parts_before_audio() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "thinking" },
                        { "inlineData": { "data": "UEND" } }
                    ]
                }
            }]
        }"#;

        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_audio(&parsed).unwrap(), "UEND");
    }

    #[test]
    fn test_missing_audio_is_an_upstream_error() {
        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{ "candidates": [] }"#).unwrap();
        assert!(matches!(
            extract_audio(&parsed),
            Err(AppError::Upstream(_))
        ));

        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{ "candidates": [{ "content": { "parts": [{ "text": "no audio" }] } }] }"#,
        )
        .unwrap();
        assert!(matches!(
            extract_audio(&parsed),
            Err(AppError::Upstream(_))
        ));
    }
}

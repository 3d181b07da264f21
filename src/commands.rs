// Tauri command handlers
use std::fs;
use std::path::PathBuf;

use tauri::{AppHandle, Manager, State};

use crate::audio::PlaybackState;
use crate::error::AppError;
use crate::session;
use crate::settings::AppSettings;
use crate::speech::{GeminiClient, VoiceName};
use crate::state::AppState;

#[derive(serde::Serialize)]
pub struct SessionSnapshot {
    pub is_generating: bool,
    pub has_audio: bool,
    pub voice: VoiceName,
    pub error: Option<String>,
    pub playback: PlaybackState,
}

fn snapshot(state: &AppState) -> SessionSnapshot {
    let playback = state.player.state();
    let session = state.session.lock().unwrap();

    SessionSnapshot {
        is_generating: session.is_generating,
        has_audio: session.has_audio(),
        voice: session.voice,
        error: session.last_error.clone(),
        playback,
    }
}

#[tauri::command]
pub async fn generate_speech(
    text: String,
    voice: VoiceName,
    state: State<'_, AppState>,
) -> Result<SessionSnapshot, String> {
    // A new generation supersedes whatever is currently playing.
    state.player.stop();

    let api_key = { state.settings.lock().unwrap().resolve_api_key() };
    let clip = match api_key {
        Some(api_key) => {
            let client = GeminiClient::new(api_key);
            session::run_generation(&client, &state.session, &text, voice).await
        }
        None => {
            let mut session = state.session.lock().unwrap();
            if session.begin_generation() {
                let error = AppError::Configuration(
                    "API key is missing. Set GEMINI_API_KEY or add a key in settings.".to_string(),
                );
                session.fail_generation(error.to_string());
            }
            None
        }
    };

    if let Some(clip) = clip {
        // Auto-play the fresh clip; a playback failure must not discard it.
        if let Err(e) = state.player.play(clip) {
            log::error!("auto-play failed: {}", e);
            state.session.lock().unwrap().set_error(e.to_string());
        }
    }

    Ok(snapshot(&state))
}

#[tauri::command]
pub fn pause_playback(state: State<'_, AppState>) -> Result<(), String> {
    state.player.pause();
    Ok(())
}

#[tauri::command]
pub fn resume_playback(state: State<'_, AppState>) -> Result<(), String> {
    state.player.resume().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn stop_playback(state: State<'_, AppState>) -> Result<(), String> {
    state.player.stop();
    Ok(())
}

#[tauri::command]
pub fn get_playback_state(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(snapshot(&state))
}

#[tauri::command]
pub fn save_recording(
    directory: Option<String>,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<String, String> {
    let wav = state
        .session
        .lock()
        .unwrap()
        .wav
        .clone()
        .ok_or_else(|| "no generated audio to save".to_string())?;

    let dir = match directory {
        Some(directory) => PathBuf::from(directory),
        None => app
            .path()
            .download_dir()
            .unwrap_or_else(|_| state.app_dir.clone()),
    };

    let filename = format!(
        "voicepad-voice-{}.wav",
        chrono::Utc::now().timestamp_millis()
    );
    let path = dir.join(filename);

    fs::write(&path, wav.as_slice()).map_err(|e| format!("failed to write {:?}: {}", path, e))?;

    log::info!("saved recording to {:?}", path);
    Ok(path.to_string_lossy().to_string())
}

#[derive(serde::Serialize)]
pub struct VoiceOption {
    pub name: VoiceName,
    pub label: &'static str,
}

#[tauri::command]
pub fn list_voices() -> Vec<VoiceOption> {
    VoiceName::ALL
        .iter()
        .map(|voice| VoiceOption {
            name: *voice,
            label: voice.label(),
        })
        .collect()
}

#[tauri::command]
pub fn get_settings(state: State<'_, AppState>) -> Result<AppSettings, String> {
    Ok(state.settings.lock().unwrap().clone())
}

#[tauri::command]
pub fn update_settings(settings: AppSettings, state: State<'_, AppState>) -> Result<(), String> {
    settings
        .save(&state.app_dir)
        .map_err(|e| format!("{:#}", e))?;
    *state.settings.lock().unwrap() = settings;
    Ok(())
}

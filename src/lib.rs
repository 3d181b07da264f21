// Voicepad - Desktop Text-to-Speech Pad
// Module declarations
mod audio;
mod commands;
mod error;
mod session;
mod settings;
mod speech;
mod state;

use settings::AppSettings;
use state::AppState;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            // Get app data directory
            let app_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data directory");

            // Load settings, falling back to defaults on a broken file
            let settings = AppSettings::load(&app_dir).unwrap_or_else(|e| {
                log::warn!("failed to load settings: {:#}", e);
                AppSettings::default()
            });

            // Create and manage app state
            let app_state = AppState::new(settings, app_dir);
            app.manage(app_state);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::generate_speech,
            commands::pause_playback,
            commands::resume_playback,
            commands::stop_playback,
            commands::get_playback_state,
            commands::save_recording,
            commands::list_voices,
            commands::get_settings,
            commands::update_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

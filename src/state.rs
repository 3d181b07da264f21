// Application state management
use std::path::PathBuf;
use std::sync::Mutex;

use crate::audio::Player;
use crate::session::Session;
use crate::settings::AppSettings;

pub struct AppState {
    pub session: Mutex<Session>,
    pub player: Player,
    pub settings: Mutex<AppSettings>,
    pub app_dir: PathBuf,
}

impl AppState {
    pub fn new(settings: AppSettings, app_dir: PathBuf) -> Self {
        Self {
            session: Mutex::new(Session::new(settings.default_voice)),
            player: Player::new(),
            settings: Mutex::new(settings),
            app_dir,
        }
    }
}

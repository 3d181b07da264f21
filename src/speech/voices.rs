// Prebuilt voice identifiers accepted by the speech service

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceName {
    Puck,
    Charon,
    Kore,
    Fenrir,
    Zephyr,
}

impl VoiceName {
    pub const ALL: [VoiceName; 5] = [
        VoiceName::Puck,
        VoiceName::Charon,
        VoiceName::Kore,
        VoiceName::Fenrir,
        VoiceName::Zephyr,
    ];

    /// Identifier sent to the speech service.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceName::Puck => "Puck",
            VoiceName::Charon => "Charon",
            VoiceName::Kore => "Kore",
            VoiceName::Fenrir => "Fenrir",
            VoiceName::Zephyr => "Zephyr",
        }
    }

    /// Short character description shown next to the voice name.
    pub fn label(&self) -> &'static str {
        match self {
            VoiceName::Puck => "Upbeat",
            VoiceName::Charon => "Deep male",
            VoiceName::Kore => "Warm female",
            VoiceName::Fenrir => "Excitable",
            VoiceName::Zephyr => "Bright",
        }
    }
}

impl Default for VoiceName {
    fn default() -> Self {
        VoiceName::Charon
    }
}

impl fmt::Display for VoiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

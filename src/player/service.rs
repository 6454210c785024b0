use std::fmt;

use serde::{Deserialize, Serialize};

/// A selectable playback backend. At most one is active at a time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerService {
    AppleMusic,
    Spotify,
}

impl PlayerService {
    pub fn name(self) -> &'static str {
        match self {
            PlayerService::AppleMusic => "Apple Music",
            PlayerService::Spotify => "Spotify",
        }
    }
}

impl fmt::Display for PlayerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

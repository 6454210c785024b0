//! Native SDK bridges for the current OS.

use std::sync::Arc;
use std::time::Duration;

use crate::player::applemusic::MusicKit;
use crate::player::spotify::SpotifyAppRemote;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(target_os = "macos"))]
pub mod generic;

/// The SDK entry points both adapters are built on.
#[derive(Clone)]
pub struct Backends {
    pub spotify: Arc<dyn SpotifyAppRemote>,
    pub music_kit: Arc<dyn MusicKit>,
}

/// Factory for the bridges of the current OS.
pub fn backends(poll_interval: Duration) -> Backends {
    #[cfg(target_os = "macos")]
    {
        Backends {
            spotify: Arc::new(macos::AppleScriptSpotify::new(poll_interval)),
            music_kit: Arc::new(macos::AppleScriptMusicKit::new(poll_interval)),
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        let _ = poll_interval;
        Backends {
            spotify: Arc::new(generic::UnsupportedPlatform),
            music_kit: Arc::new(generic::UnsupportedPlatform),
        }
    }
}

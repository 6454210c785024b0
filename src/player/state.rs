use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShuffleMode {
    #[default]
    Off,
    On,
}

/// Stable identity of a track, used to key artwork lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a track's artwork comes from. Resolution happens outside the
/// negotiation layer, see [`crate::player::artwork`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Artwork {
    /// Plain image URL.
    Url(String),
    /// Vendor image reference that must be fetched through the vendor's image API.
    ImageUri(String),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub album: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub artwork: Artwork,
}

impl Track {
    /// Artists joined for display.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// Normalized snapshot of what a connected player is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// `None` when the player is connected but has nothing loaded.
    pub track: Option<Track>,
    pub status: PlaybackStatus,
    pub position_ms: u64,
    pub repeat_mode: RepeatMode,
    pub shuffle_mode: ShuffleMode,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

/// Fallback for a vendor value with no normalized counterpart.
///
/// Panics in debug builds so new vendor values get noticed, and degrades to
/// the default in release builds.
pub(crate) fn unmapped<T: Default>(what: &str, raw: &str) -> T {
    tracing::warn!(what, raw, "unmapped vendor value");
    debug_assert!(false, "unmapped {what}: {raw:?}");
    T::default()
}

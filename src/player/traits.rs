use super::applemusic::AppleMusicPlayer;
use super::session::PlaybackUpdates;
use super::spotify::SpotifyPlayer;
use super::{PlaybackState, PlayerError, PlayerService, RepeatMode, ShuffleMode};

/// The unified player. Call sites never branch on the vendor except for
/// vendor-only extras.
///
/// A `Player` belongs to one [`crate::player::ConnectionState::Connected`]
/// value. Once that connection is gone every command fails with
/// [`PlayerError::Inactive`]; get a fresh player from the new state instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Player {
    Spotify(SpotifyPlayer),
    AppleMusic(AppleMusicPlayer),
}

impl Player {
    pub fn service(&self) -> PlayerService {
        match self {
            Player::Spotify(_) => PlayerService::Spotify,
            Player::AppleMusic(_) => PlayerService::AppleMusic,
        }
    }

    pub fn is_live(&self) -> bool {
        match self {
            Player::Spotify(p) => p.is_live(),
            Player::AppleMusic(p) => p.is_live(),
        }
    }

    pub async fn resume(&self) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.resume().await,
            Player::AppleMusic(p) => p.resume().await,
        }
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.pause().await,
            Player::AppleMusic(p) => p.pause().await,
        }
    }

    pub async fn stop(&self) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.stop().await,
            Player::AppleMusic(p) => p.stop().await,
        }
    }

    pub async fn skip_next(&self) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.skip_next().await,
            Player::AppleMusic(p) => p.skip_next().await,
        }
    }

    pub async fn skip_previous(&self) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.skip_previous().await,
            Player::AppleMusic(p) => p.skip_previous().await,
        }
    }

    /// Fresh snapshot straight from the vendor.
    pub async fn current_state(&self) -> Result<PlaybackState, PlayerError> {
        match self {
            Player::Spotify(p) => p.current_state().await,
            Player::AppleMusic(p) => p.current_state().await,
        }
    }

    /// Conflated playback updates; the native listener stays attached while
    /// the returned value is alive.
    pub fn observe_state(&self) -> Result<PlaybackUpdates, PlayerError> {
        match self {
            Player::Spotify(p) => p.observe_state(),
            Player::AppleMusic(p) => p.observe_state(),
        }
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.seek_to(position_ms).await,
            Player::AppleMusic(p) => p.seek_to(position_ms).await,
        }
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.set_repeat_mode(mode).await,
            Player::AppleMusic(p) => p.set_repeat_mode(mode).await,
        }
    }

    pub async fn set_shuffle_mode(&self, mode: ShuffleMode) -> Result<(), PlayerError> {
        match self {
            Player::Spotify(p) => p.set_shuffle_mode(mode).await,
            Player::AppleMusic(p) => p.set_shuffle_mode(mode).await,
        }
    }
}

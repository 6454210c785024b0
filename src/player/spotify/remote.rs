//! The seam to the Spotify App Remote SDK.
//!
//! Hosts bind the real SDK (or the desktop bridge in
//! [`crate::player::platform`]) by implementing [`SpotifyAppRemote`] and
//! [`SpotifyRemote`]. Everything here is blocking and may be called from any
//! thread; the connector moves the calls onto the blocking pool.

use std::sync::Arc;

use thiserror::Error;

use crate::player::{ConnectError, PlayerError, PlayerService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyArtist {
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyAlbum {
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyTrack {
    pub name: String,
    pub uri: String,
    pub artist: SpotifyArtist,
    pub artists: Vec<SpotifyArtist>,
    pub album: SpotifyAlbum,
    /// Milliseconds.
    pub duration: u64,
    pub image_uri: Option<String>,
    pub is_episode: bool,
    pub is_podcast: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyRepeat {
    Off,
    Track,
    Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotifyPlayerOptions {
    pub is_shuffling: bool,
    pub repeat_mode: SpotifyRepeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyPlayerState {
    pub track: Option<SpotifyTrack>,
    pub is_paused: bool,
    pub playback_speed: f32,
    /// Milliseconds.
    pub playback_position: u64,
    pub playback_options: Option<SpotifyPlayerOptions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDimension {
    Large,
    Medium,
    Small,
    XSmall,
    Thumbnail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub client_id: String,
    pub redirect_uri: String,
    pub show_auth_view: bool,
}

/// Errors as the SDK reports them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpotifyNativeError {
    #[error("Spotify app could not be found")]
    CouldNotFindSpotifyApp,
    #[error("user is not logged in to Spotify")]
    NotLoggedIn,
    #[error("user did not authorize the app: {0}")]
    UserNotAuthorized(String),
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("Spotify Premium is required")]
    PremiumRequired,
    #[error("Spotify app is too old")]
    UnsupportedFeatureVersion,
    #[error("Spotify is in offline mode")]
    OfflineMode,
    #[error("connection to Spotify was terminated")]
    ConnectionTerminated,
    #[error("not supported by this Spotify bridge")]
    Unsupported,
    #[error("{0}")]
    Other(String),
}

impl From<SpotifyNativeError> for ConnectError {
    fn from(error: SpotifyNativeError) -> Self {
        match error {
            SpotifyNativeError::CouldNotFindSpotifyApp => ConnectError::NotInstalled,
            SpotifyNativeError::UserNotAuthorized(_) => ConnectError::UserCancelled,
            SpotifyNativeError::AuthenticationFailed | SpotifyNativeError::NotLoggedIn => {
                ConnectError::AuthError
            }
            SpotifyNativeError::PremiumRequired => ConnectError::NoSubscription,
            SpotifyNativeError::UnsupportedFeatureVersion
            | SpotifyNativeError::OfflineMode
            | SpotifyNativeError::ConnectionTerminated
            | SpotifyNativeError::Unsupported
            | SpotifyNativeError::Other(_) => ConnectError::Unknown,
        }
    }
}

impl From<SpotifyNativeError> for PlayerError {
    fn from(error: SpotifyNativeError) -> Self {
        match error {
            SpotifyNativeError::Unsupported => PlayerError::Unsupported(PlayerService::Spotify),
            other => PlayerError::Rejected {
                service: PlayerService::Spotify,
                message: other.to_string(),
            },
        }
    }
}

/// Invoked on a vendor thread when an established connection drops.
pub type ConnectionLost = Box<dyn Fn(SpotifyNativeError) + Send + Sync>;

/// Invoked on a vendor thread for every player state event.
pub type PlayerStateCallback = Box<dyn Fn(SpotifyPlayerState) + Send + Sync>;

/// Handle of a native event subscription; cancelling stops the callbacks.
pub struct NativeSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl NativeSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for NativeSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

pub trait SpotifyAppRemote: Send + Sync {
    fn is_installed(&self) -> bool;

    /// Blocks until the connection is established or refused.
    fn connect(
        &self,
        params: &ConnectionParams,
        on_lost: ConnectionLost,
    ) -> Result<Arc<dyn SpotifyRemote>, SpotifyNativeError>;
}

pub trait SpotifyRemote: Send + Sync {
    fn player_state(&self) -> Result<SpotifyPlayerState, SpotifyNativeError>;
    fn subscribe_to_player_state(&self, callback: PlayerStateCallback) -> NativeSubscription;
    fn play(&self, uri: &str) -> Result<(), SpotifyNativeError>;
    fn resume(&self) -> Result<(), SpotifyNativeError>;
    fn pause(&self) -> Result<(), SpotifyNativeError>;
    fn skip_next(&self) -> Result<(), SpotifyNativeError>;
    fn skip_previous(&self) -> Result<(), SpotifyNativeError>;
    fn set_shuffle(&self, enabled: bool) -> Result<(), SpotifyNativeError>;
    fn set_repeat(&self, mode: SpotifyRepeat) -> Result<(), SpotifyNativeError>;
    fn seek_to(&self, position_ms: u64) -> Result<(), SpotifyNativeError>;
    /// Encoded image bytes for an image URI from [`SpotifyTrack::image_uri`].
    fn image(&self, uri: &str, dimension: ImageDimension) -> Result<Vec<u8>, SpotifyNativeError>;
    fn disconnect(&self);
}

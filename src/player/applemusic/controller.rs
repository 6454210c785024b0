//! The seam to MusicKit.
//!
//! MusicKit reports player modes as raw integer codes (see [`codes`]) and
//! pushes changes to registered [`MusicPlayerListener`]s from its own threads.
//! All methods are blocking.

use std::sync::Arc;

use thiserror::Error;

use crate::player::auth::{DeveloperToken, MusicUserToken};
use crate::player::{ConnectError, PlayerError, PlayerService};

/// Raw MusicKit player codes.
pub mod codes {
    pub mod playback {
        pub const STOPPED: i32 = 0;
        pub const PLAYING: i32 = 1;
        pub const PAUSED: i32 = 2;
        pub const INTERRUPTED: i32 = 3;
        pub const SEEKING_FORWARD: i32 = 4;
        pub const SEEKING_BACKWARD: i32 = 5;
    }

    pub mod repeat {
        pub const OFF: i32 = 0;
        pub const ONE: i32 = 1;
        pub const ALL: i32 = 2;
        pub const DEFAULT: i32 = 3;
    }

    pub mod shuffle {
        pub const OFF: i32 = 0;
        pub const SONGS: i32 = 1;
        pub const ALBUMS: i32 = 2;
        pub const DEFAULT: i32 = 3;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaItem {
    pub store_id: Option<String>,
    pub title: Option<String>,
    pub album_title: Option<String>,
    pub artist_name: Option<String>,
    pub album_artist_name: Option<String>,
    /// Milliseconds.
    pub duration: u64,
    pub artwork_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MusicKitError {
    #[error("not supported by this MusicKit bridge")]
    Unsupported,
    #[error("{0}")]
    Failed(String),
}

impl From<MusicKitError> for PlayerError {
    fn from(error: MusicKitError) -> Self {
        match error {
            MusicKitError::Unsupported => PlayerError::Unsupported(PlayerService::AppleMusic),
            MusicKitError::Failed(message) => PlayerError::Rejected {
                service: PlayerService::AppleMusic,
                message,
            },
        }
    }
}

/// Outcome of a user token request as MusicKit reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("user cancelled the authorization")]
    UserCancelled,
    #[error("no Apple Music subscription")]
    NoSubscription,
    #[error("Apple Music subscription expired")]
    SubscriptionExpired,
    #[error("developer token was rejected")]
    TokenFetchError,
    #[error("account is restricted")]
    UserRestricted,
    #[error("unknown MusicKit error")]
    Unknown,
}

impl From<TokenError> for ConnectError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::UserCancelled => ConnectError::UserCancelled,
            TokenError::NoSubscription
            | TokenError::SubscriptionExpired
            | TokenError::UserRestricted => ConnectError::NoSubscription,
            TokenError::TokenFetchError => ConnectError::AuthError,
            TokenError::Unknown => ConnectError::Unknown,
        }
    }
}

/// An OS-level authorization flow the host has to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectIntent {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Granted(MusicUserToken),
    RequiresUser(ConnectIntent),
    Denied(TokenError),
}

pub trait MusicKit: Send + Sync {
    fn is_installed(&self) -> bool;
    /// Bridges that play through a signed-in local app need no developer token.
    fn requires_developer_token(&self) -> bool {
        true
    }
    fn authorize(&self, developer_token: &DeveloperToken) -> Authorization;
    fn create_controller(
        &self,
        developer_token: &DeveloperToken,
        user_token: &MusicUserToken,
    ) -> Result<Arc<dyn MusicPlayerController>, TokenError>;
}

/// Delegate for controller events. Several callbacks usually fire for one
/// logical change.
pub trait MusicPlayerListener: Send + Sync {
    fn on_playback_state_changed(&self, _state: i32) {}
    fn on_current_item_changed(&self, _item: Option<&MediaItem>) {}
    fn on_metadata_updated(&self, _item: &MediaItem) {}
}

pub trait MusicPlayerController: Send + Sync {
    fn current_item(&self) -> Option<MediaItem>;
    fn playback_state(&self) -> i32;
    fn playback_position(&self) -> u64;
    fn repeat_mode(&self) -> i32;
    fn shuffle_mode(&self) -> i32;

    fn play(&self) -> Result<(), MusicKitError>;
    fn pause(&self) -> Result<(), MusicKitError>;
    fn stop(&self) -> Result<(), MusicKitError>;
    fn skip_to_next_item(&self) -> Result<(), MusicKitError>;
    fn skip_to_previous_item(&self) -> Result<(), MusicKitError>;
    fn seek_to_position(&self, position_ms: u64) -> Result<(), MusicKitError>;
    fn set_repeat_mode(&self, code: i32) -> Result<(), MusicKitError>;
    fn set_shuffle_mode(&self, code: i32) -> Result<(), MusicKitError>;
    /// Replace the queue with catalog songs.
    fn set_queue(&self, store_ids: &[String], play_when_ready: bool) -> Result<(), MusicKitError>;

    fn add_listener(&self, listener: Arc<dyn MusicPlayerListener>);
    fn remove_listener(&self, listener: &Arc<dyn MusicPlayerListener>);
    fn release(&self);
}

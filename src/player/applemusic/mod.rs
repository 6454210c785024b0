//! Apple Music adapter: MusicKit seam, authorization lifecycle and player façade.

mod authentication;
pub mod controller;
mod player;

pub use authentication::{AppleMusicAuthentication, AppleMusicAuthenticationStatus};
pub use controller::{
    Authorization, ConnectIntent, MediaItem, MusicKit, MusicKitError, MusicPlayerController,
    MusicPlayerListener, TokenError,
};
pub use player::{AppleMusicPlayer, AppleMusicSession};

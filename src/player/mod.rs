pub mod adapter;
pub mod applemusic;
pub mod artwork;
pub mod auth;
mod error;
pub mod matching;
pub mod negotiation;
pub mod platform;
pub mod remote;
mod service;
pub mod session;
pub mod signal;
pub mod spotify;
mod state;
mod traits;

pub use adapter::{AdapterPhase, PlatformAdapter, ServiceStatus, Teardown};
pub use error::{ConnectError, PlayerError};
pub use negotiation::{ConnectionState, PlayerNegotiation};
pub use service::PlayerService;
pub use session::PlaybackUpdates;
pub use state::{Artwork, PlaybackState, PlaybackStatus, RepeatMode, ShuffleMode, Track, TrackId};
pub use traits::Player;

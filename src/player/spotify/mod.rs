//! Spotify adapter: App Remote seam, connection lifecycle and player façade.

mod connector;
mod player;
pub mod remote;

pub use connector::{SpotifyConnectionState, SpotifyConnector};
pub use player::{SpotifyPlayer, SpotifySession};
pub use remote::{ConnectionParams, ImageDimension, SpotifyAppRemote, SpotifyRemote};

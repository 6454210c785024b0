use std::sync::Arc;

use super::remote::{ImageDimension, SpotifyPlayerState, SpotifyRemote, SpotifyRepeat, SpotifyTrack};
use crate::player::session::{PlaybackUpdates, Session};
use crate::player::{
    Artwork, PlaybackState, PlaybackStatus, PlayerError, RepeatMode, ShuffleMode, Track, TrackId,
};

pub type SpotifySession = Session<dyn SpotifyRemote>;

/// Spotify side of [`crate::player::Player`]. Valid only while its session is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyPlayer {
    session: Arc<SpotifySession>,
}

impl SpotifyPlayer {
    pub(crate) fn new(session: Arc<SpotifySession>) -> Self {
        Self { session }
    }

    pub fn is_live(&self) -> bool {
        self.session.is_live()
    }

    pub async fn resume(&self) -> Result<(), PlayerError> {
        self.session.call(|remote| remote.resume()).await
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.session.call(|remote| remote.pause()).await
    }

    /// The App Remote has no stop; this only validates the session.
    pub async fn stop(&self) -> Result<(), PlayerError> {
        self.session.call(|_| Ok::<_, PlayerError>(())).await
    }

    pub async fn skip_next(&self) -> Result<(), PlayerError> {
        self.session.call(|remote| remote.skip_next()).await
    }

    pub async fn skip_previous(&self) -> Result<(), PlayerError> {
        self.session.call(|remote| remote.skip_previous()).await
    }

    pub async fn current_state(&self) -> Result<PlaybackState, PlayerError> {
        self.session
            .call(|remote| remote.player_state().map(PlaybackState::from))
            .await
    }

    pub fn observe_state(&self) -> Result<PlaybackUpdates, PlayerError> {
        self.session.observe()
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<(), PlayerError> {
        self.session.call(move |remote| remote.seek_to(position_ms)).await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), PlayerError> {
        let native = match mode {
            RepeatMode::Off => SpotifyRepeat::Off,
            RepeatMode::One => SpotifyRepeat::Track,
            RepeatMode::All => SpotifyRepeat::Context,
        };
        self.session.call(move |remote| remote.set_repeat(native)).await
    }

    pub async fn set_shuffle_mode(&self, mode: ShuffleMode) -> Result<(), PlayerError> {
        let enabled = mode == ShuffleMode::On;
        self.session.call(move |remote| remote.set_shuffle(enabled)).await
    }

    /// Start playback of a Spotify URI (`spotify:track:...`).
    pub async fn play_uri(&self, uri: &str) -> Result<(), PlayerError> {
        let uri = uri.to_string();
        self.session.call(move |remote| remote.play(&uri)).await
    }

    pub async fn image(
        &self,
        uri: &str,
        dimension: ImageDimension,
    ) -> Result<Vec<u8>, PlayerError> {
        let uri = uri.to_string();
        self.session.call(move |remote| remote.image(&uri, dimension)).await
    }
}

impl From<SpotifyTrack> for Track {
    fn from(track: SpotifyTrack) -> Self {
        Track {
            id: TrackId(track.uri),
            title: track.name,
            album: track.album.name,
            artists: track.artists.into_iter().map(|artist| artist.name).collect(),
            duration_ms: track.duration,
            artwork: track.image_uri.map_or(Artwork::None, Artwork::ImageUri),
        }
    }
}

impl From<SpotifyPlayerState> for PlaybackState {
    fn from(state: SpotifyPlayerState) -> Self {
        let (repeat_mode, shuffle_mode) = match state.playback_options {
            Some(options) => (
                match options.repeat_mode {
                    SpotifyRepeat::Off => RepeatMode::Off,
                    SpotifyRepeat::Track => RepeatMode::One,
                    SpotifyRepeat::Context => RepeatMode::All,
                },
                if options.is_shuffling {
                    ShuffleMode::On
                } else {
                    ShuffleMode::Off
                },
            ),
            None => {
                tracing::warn!("Spotify reported a player state without playback options");
                (RepeatMode::Off, ShuffleMode::Off)
            }
        };

        PlaybackState {
            // The SDK reports placeholder tracks without a name between items.
            track: state
                .track
                .filter(|track| !track.name.is_empty())
                .map(Track::from),
            status: if state.is_paused {
                PlaybackStatus::Paused
            } else {
                PlaybackStatus::Playing
            },
            position_ms: state.playback_position,
            repeat_mode,
            shuffle_mode,
        }
    }
}

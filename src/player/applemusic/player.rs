use std::sync::Arc;

use super::controller::{codes, MediaItem, MusicKitError, MusicPlayerController};
use crate::player::session::{PlaybackUpdates, Session};
use crate::player::state::unmapped;
use crate::player::{
    Artwork, PlaybackState, PlaybackStatus, PlayerError, RepeatMode, ShuffleMode, Track, TrackId,
};

pub type AppleMusicSession = Session<dyn MusicPlayerController>;

const UNKNOWN: &str = "<Unknown>";

/// Apple Music side of [`crate::player::Player`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppleMusicPlayer {
    session: Arc<AppleMusicSession>,
}

impl AppleMusicPlayer {
    pub(crate) fn new(session: Arc<AppleMusicSession>) -> Self {
        Self { session }
    }

    pub fn is_live(&self) -> bool {
        self.session.is_live()
    }

    pub async fn resume(&self) -> Result<(), PlayerError> {
        self.session.call(|controller| controller.play()).await
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.session.call(|controller| controller.pause()).await
    }

    pub async fn stop(&self) -> Result<(), PlayerError> {
        self.session.call(|controller| controller.stop()).await
    }

    pub async fn skip_next(&self) -> Result<(), PlayerError> {
        self.session.call(|controller| controller.skip_to_next_item()).await
    }

    pub async fn skip_previous(&self) -> Result<(), PlayerError> {
        self.session
            .call(|controller| controller.skip_to_previous_item())
            .await
    }

    pub async fn current_state(&self) -> Result<PlaybackState, PlayerError> {
        self.session
            .call(|controller| Ok::<_, MusicKitError>(snapshot(controller)))
            .await
    }

    pub fn observe_state(&self) -> Result<PlaybackUpdates, PlayerError> {
        self.session.observe()
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<(), PlayerError> {
        self.session
            .call(move |controller| controller.seek_to_position(position_ms))
            .await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), PlayerError> {
        let code = match mode {
            RepeatMode::Off => codes::repeat::OFF,
            RepeatMode::One => codes::repeat::ONE,
            RepeatMode::All => codes::repeat::ALL,
        };
        self.session
            .call(move |controller| controller.set_repeat_mode(code))
            .await
    }

    pub async fn set_shuffle_mode(&self, mode: ShuffleMode) -> Result<(), PlayerError> {
        let code = match mode {
            ShuffleMode::Off => codes::shuffle::OFF,
            ShuffleMode::On => codes::shuffle::SONGS,
        };
        self.session
            .call(move |controller| controller.set_shuffle_mode(code))
            .await
    }

    /// Replace the queue with the given catalog song ids.
    pub async fn set_queue(
        &self,
        store_ids: Vec<String>,
        play_when_ready: bool,
    ) -> Result<(), PlayerError> {
        self.session
            .call(move |controller| controller.set_queue(&store_ids, play_when_ready))
            .await
    }
}

/// Read the controller's granular getters into one [`PlaybackState`].
pub(crate) fn snapshot(controller: &dyn MusicPlayerController) -> PlaybackState {
    PlaybackState {
        track: controller.current_item().map(Track::from),
        status: playback_status(controller.playback_state()),
        position_ms: controller.playback_position(),
        repeat_mode: repeat_mode(controller.repeat_mode()),
        shuffle_mode: shuffle_mode(controller.shuffle_mode()),
    }
}

fn playback_status(code: i32) -> PlaybackStatus {
    match code {
        codes::playback::STOPPED => PlaybackStatus::Stopped,
        codes::playback::PAUSED | codes::playback::INTERRUPTED => PlaybackStatus::Paused,
        codes::playback::PLAYING
        | codes::playback::SEEKING_FORWARD
        | codes::playback::SEEKING_BACKWARD => PlaybackStatus::Playing,
        other => unmapped("playback state", &other.to_string()),
    }
}

fn repeat_mode(code: i32) -> RepeatMode {
    match code {
        codes::repeat::OFF | codes::repeat::DEFAULT => RepeatMode::Off,
        codes::repeat::ONE => RepeatMode::One,
        codes::repeat::ALL => RepeatMode::All,
        other => unmapped("repeat mode", &other.to_string()),
    }
}

fn shuffle_mode(code: i32) -> ShuffleMode {
    match code {
        codes::shuffle::OFF | codes::shuffle::DEFAULT => ShuffleMode::Off,
        codes::shuffle::SONGS | codes::shuffle::ALBUMS => ShuffleMode::On,
        other => unmapped("shuffle mode", &other.to_string()),
    }
}

impl From<MediaItem> for Track {
    fn from(item: MediaItem) -> Self {
        let title = item.title.unwrap_or_else(|| UNKNOWN.to_string());
        let album = item.album_title.unwrap_or_else(|| UNKNOWN.to_string());
        let artist = item
            .artist_name
            .or(item.album_artist_name)
            .unwrap_or_else(|| UNKNOWN.to_string());
        // Items outside the catalog have no store id.
        let id = item
            .store_id
            .unwrap_or_else(|| format!("{artist}/{album}/{title}"));

        Track {
            id: TrackId(id),
            title,
            album,
            artists: vec![artist],
            duration_ms: item.duration,
            artwork: item.artwork_url.map_or(Artwork::None, Artwork::Url),
        }
    }
}

//! What a frontend shows for the player: the connection state merged with the
//! connected player's playback.

use serde::Serialize;
use tokio::task::JoinHandle;

use super::negotiation::ConnectionState;
use super::signal::{Observer, Signal};
use super::{PlaybackState, PlayerService, Track};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum RemoteState {
    Disconnected,
    Connecting { service: PlayerService },
    Connected(Connected),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "playback", rename_all = "kebab-case")]
pub enum Connected {
    NoPlayback {
        service: PlayerService,
    },
    Playback {
        service: PlayerService,
        track: Track,
        is_paused: bool,
        position_ms: u64,
    },
}

impl RemoteState {
    pub fn service(&self) -> Option<PlayerService> {
        match self {
            RemoteState::Disconnected => None,
            RemoteState::Connecting { service }
            | RemoteState::Connected(Connected::NoPlayback { service })
            | RemoteState::Connected(Connected::Playback { service, .. }) => Some(*service),
        }
    }
}

/// Errors render as disconnected; the frontend offers a retry either way.
pub fn remote_state(connection: &ConnectionState, playback: Option<&PlaybackState>) -> RemoteState {
    match connection {
        ConnectionState::NotConnected | ConnectionState::Error(..) => RemoteState::Disconnected,
        ConnectionState::Connecting(service) => RemoteState::Connecting { service: *service },
        ConnectionState::Connected(service, _) => {
            let service = *service;
            RemoteState::Connected(
                match playback.and_then(|state| state.track.clone().map(|track| (state, track))) {
                    Some((state, track)) => Connected::Playback {
                        service,
                        track,
                        is_paused: !state.is_playing(),
                        position_ms: state.position_ms,
                    },
                    None => Connected::NoPlayback { service },
                },
            )
        }
    }
}

enum Wake {
    Connection,
    Playback(PlaybackState),
    PlayerGone,
}

/// Follows a negotiation and, while connected, the current player's playback,
/// switching to the new player's updates whenever the connection changes.
pub struct RemoteStateTracker {
    state: Signal<RemoteState>,
    task: JoinHandle<()>,
}

impl RemoteStateTracker {
    /// Must be called from within a Tokio runtime.
    pub fn new(mut connection: Observer<ConnectionState>) -> Self {
        let state = Signal::new(RemoteState::Disconnected);
        let publisher = state.publisher();

        let task = tokio::spawn(async move {
            loop {
                let current = connection.latest();
                publisher.publish(remote_state(&current, None));

                let Some(mut updates) = current.player().and_then(|p| p.observe_state().ok())
                else {
                    connection.changed().await;
                    continue;
                };

                loop {
                    let wake = tokio::select! {
                        _ = connection.changed() => Wake::Connection,
                        next = updates.next() => match next {
                            Some(playback) => Wake::Playback(playback),
                            None => Wake::PlayerGone,
                        },
                    };
                    match wake {
                        Wake::Connection => break,
                        Wake::Playback(playback) => {
                            publisher.publish(remote_state(&current, Some(&playback)));
                        }
                        Wake::PlayerGone => {
                            // The negotiation catches up with a new state shortly.
                            connection.changed().await;
                            break;
                        }
                    }
                }
            }
        });

        Self { state, task }
    }

    pub fn current(&self) -> RemoteState {
        self.state.get()
    }

    pub fn observe(&self) -> Observer<RemoteState> {
        self.state.subscribe()
    }
}

impl Drop for RemoteStateTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Artwork, ConnectError, PlaybackStatus, RepeatMode, ShuffleMode, TrackId};

    fn playback(track: Option<Track>, status: PlaybackStatus) -> PlaybackState {
        PlaybackState {
            track,
            status,
            position_ms: 4_200,
            repeat_mode: RepeatMode::Off,
            shuffle_mode: ShuffleMode::Off,
        }
    }

    #[test]
    fn test_error_renders_disconnected() {
        let state = remote_state(
            &ConnectionState::Error(PlayerService::Spotify, ConnectError::NoSubscription),
            None,
        );
        assert_eq!(state, RemoteState::Disconnected);
        assert_eq!(state.service(), None);
    }

    #[test]
    fn test_connecting() {
        let state = remote_state(&ConnectionState::Connecting(PlayerService::AppleMusic), None);
        assert_eq!(
            state,
            RemoteState::Connecting {
                service: PlayerService::AppleMusic
            }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let track = Track {
            id: TrackId("t".to_string()),
            title: "Song".to_string(),
            album: "Album".to_string(),
            artists: vec!["Artist".to_string()],
            duration_ms: 1_000,
            artwork: Artwork::None,
        };
        let state = RemoteState::Connected(Connected::Playback {
            service: PlayerService::Spotify,
            track,
            is_paused: !playback(None, PlaybackStatus::Paused).is_playing(),
            position_ms: 4_200,
        });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "connected");
        assert_eq!(json["playback"], "playback");
        assert_eq!(json["service"], "spotify");
        assert_eq!(json["is_paused"], true);
    }
}

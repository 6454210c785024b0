//! Arbitration between the two services.
//!
//! [`PlayerNegotiation`] owns the selected service and derives the one
//! [`ConnectionState`] consumers see from three inputs: the selection and the
//! two adapters' own states. The derivation is [`project`], a pure function,
//! re-run whenever any input changes.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::adapter::{AdapterPhase, PlatformAdapter, ServiceStatus, Teardown};
use super::applemusic::{
    AppleMusicAuthentication, AppleMusicAuthenticationStatus, AppleMusicPlayer,
};
use super::signal::{lock, Observer, Signal};
use super::spotify::{SpotifyConnectionState, SpotifyConnector, SpotifyPlayer};
use super::{ConnectError, Player, PlayerService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    NotConnected,
    Connecting(PlayerService),
    Connected(PlayerService, Player),
    Error(PlayerService, ConnectError),
}

impl ConnectionState {
    pub fn service(&self) -> Option<PlayerService> {
        match self {
            ConnectionState::NotConnected => None,
            ConnectionState::Connecting(service)
            | ConnectionState::Connected(service, _)
            | ConnectionState::Error(service, _) => Some(*service),
        }
    }

    pub fn player(&self) -> Option<&Player> {
        match self {
            ConnectionState::Connected(_, player) => Some(player),
            _ => None,
        }
    }
}

/// Unified state for a selection. Only the selected adapter's state is
/// consulted, so a lingering adapter never leaks through.
pub fn project(
    selected: Option<PlayerService>,
    spotify: &SpotifyConnectionState,
    apple_music: &AppleMusicAuthenticationStatus,
) -> ConnectionState {
    match selected {
        None => ConnectionState::NotConnected,
        Some(service @ PlayerService::Spotify) => match spotify {
            SpotifyConnectionState::Connected(session) => ConnectionState::Connected(
                service,
                Player::Spotify(SpotifyPlayer::new(session.clone())),
            ),
            SpotifyConnectionState::Disconnected { error: Some(error) }
            | SpotifyConnectionState::FailedToConnect(error) => {
                ConnectionState::Error(service, *error)
            }
            SpotifyConnectionState::Disconnected { error: None } => {
                ConnectionState::Connecting(service)
            }
        },
        Some(service @ PlayerService::AppleMusic) => match apple_music {
            AppleMusicAuthenticationStatus::Success(session) => ConnectionState::Connected(
                service,
                Player::AppleMusic(AppleMusicPlayer::new(session.clone())),
            ),
            AppleMusicAuthenticationStatus::Error(error) => ConnectionState::Error(service, *error),
            AppleMusicAuthenticationStatus::NotDetermined => ConnectionState::Connecting(service),
        },
    }
}

struct Shared {
    spotify: SpotifyConnector,
    apple_music: AppleMusicAuthentication,
    selected: Signal<Option<PlayerService>>,
    state: Signal<ConnectionState>,
    // Held while projecting, so the last refresh always sees the newest inputs.
    // Selection changes hold it throughout.
    projecting: Mutex<()>,
}

impl Shared {
    fn refresh(&self) {
        let _projecting = lock(&self.projecting);
        self.publish_projection();
    }

    /// Caller holds `projecting`.
    fn publish_projection(&self) {
        let next = project(
            self.selected.get(),
            &self.spotify.current(),
            &self.apple_music.current(),
        );
        if self.state.publisher().publish(next.clone()) {
            debug!(state = ?next, "connection state changed");
        }
    }

    fn adapters(&self) -> [&dyn PlatformAdapter; 2] {
        [&self.spotify, &self.apple_music]
    }

    fn adapter(&self, service: PlayerService) -> &dyn PlatformAdapter {
        match service {
            PlayerService::Spotify => &self.spotify,
            PlayerService::AppleMusic => &self.apple_music,
        }
    }

    /// Tear down every adapter except `keep`; live ones get a graceful hand-off.
    fn release_others(&self, keep: Option<PlayerService>) -> Teardown {
        self.adapters()
            .into_iter()
            .filter(|adapter| Some(adapter.service()) != keep)
            .fold(Teardown::default(), |teardown, adapter| {
                let released = match adapter.phase() {
                    AdapterPhase::Idle => Teardown::default(),
                    AdapterPhase::Live => {
                        info!(service = %adapter.service(), "handing off");
                        adapter.hand_off()
                    }
                    AdapterPhase::Connecting | AdapterPhase::Failed => adapter.disconnect(),
                };
                teardown.merge(released)
            })
    }
}

pub struct PlayerNegotiation {
    shared: Arc<Shared>,
    // Serializes selection changes.
    control: Mutex<()>,
    combine: JoinHandle<()>,
}

impl PlayerNegotiation {
    /// Must be called from within a Tokio runtime.
    pub fn new(spotify: SpotifyConnector, apple_music: AppleMusicAuthentication) -> Self {
        let shared = Arc::new(Shared {
            spotify,
            apple_music,
            selected: Signal::new(None),
            state: Signal::new(ConnectionState::NotConnected),
            projecting: Mutex::new(()),
        });

        let mut selected = shared.selected.subscribe();
        let mut spotify = shared.spotify.state();
        let mut apple_music = shared.apple_music.status();
        let combined = shared.clone();
        let combine = tokio::spawn(async move {
            loop {
                // Mark everything seen first; whatever arrives after this
                // wakes the select below.
                let _ = (selected.latest(), spotify.latest(), apple_music.latest());
                combined.refresh();
                tokio::select! {
                    _ = selected.changed() => {}
                    _ = spotify.changed() => {}
                    _ = apple_music.changed() => {}
                }
            }
        });

        Self {
            shared,
            control: Mutex::new(()),
            combine,
        }
    }

    /// Select `service`: release the other adapter, then connect this one.
    /// Selecting the current service again retries only after a failure.
    pub fn set_service(&self, service: PlayerService) {
        let _control = lock(&self.control);
        // Nothing is projected until selection and adapters agree again.
        let _projecting = lock(&self.shared.projecting);
        if self.shared.selected.publisher().publish(Some(service)) {
            info!(%service, "service selected");
        }

        let teardown = self.shared.release_others(Some(service));
        let target = self.shared.adapter(service);
        match target.phase() {
            AdapterPhase::Idle | AdapterPhase::Failed => target.connect_after(teardown),
            AdapterPhase::Connecting | AdapterPhase::Live => {
                debug!(%service, "already connecting or connected");
            }
        }
        self.shared.publish_projection();
    }

    /// Clear the selection and release every adapter.
    pub fn disconnect(&self) {
        let _control = lock(&self.control);
        let _projecting = lock(&self.shared.projecting);
        if self.shared.selected.publisher().publish(None) {
            info!("service deselected");
        }
        self.shared.release_others(None);
        self.shared.publish_projection();
    }

    pub fn selected(&self) -> Option<PlayerService> {
        self.shared.selected.get()
    }

    pub fn current(&self) -> ConnectionState {
        self.shared.state.get()
    }

    pub fn state(&self) -> Observer<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn player_or_none(&self) -> Option<Player> {
        self.current().player().cloned()
    }

    pub fn available_services(&self) -> Vec<ServiceStatus> {
        self.shared
            .adapters()
            .into_iter()
            .map(ServiceStatus::of)
            .collect()
    }

    pub fn spotify(&self) -> &SpotifyConnector {
        &self.shared.spotify
    }

    pub fn apple_music(&self) -> &AppleMusicAuthentication {
        &self.shared.apple_music
    }
}

impl Drop for PlayerNegotiation {
    fn drop(&mut self) {
        self.combine.abort();
    }
}

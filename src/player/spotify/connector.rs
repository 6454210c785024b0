//! Spotify connection lifecycle.
//!
//! [`SpotifyConnector`] owns the one App Remote connection of the process and
//! publishes its state as a [`Signal`]. Attempts are numbered; a connection
//! that lands after its attempt was abandoned is closed immediately.

use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use super::player::SpotifySession;
use super::remote::{
    ConnectionLost, ConnectionParams, SpotifyAppRemote, SpotifyNativeError, SpotifyRemote,
};
use crate::player::adapter::{AdapterPhase, PlatformAdapter, Teardown};
use crate::player::session::Session;
use crate::player::signal::{lock, Observer, Signal};
use crate::player::{ConnectError, PlaybackState, PlayerService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotifyConnectionState {
    /// Idle, or waiting for an attempt when `error` is `None`. Carries the
    /// reason when an established connection was lost.
    Disconnected { error: Option<ConnectError> },
    FailedToConnect(ConnectError),
    Connected(Arc<SpotifySession>),
}

#[derive(Default)]
struct Attempt {
    generation: u64,
    pending: bool,
}

struct Inner {
    app_remote: Arc<dyn SpotifyAppRemote>,
    params: ConnectionParams,
    runtime: Handle,
    state: Signal<SpotifyConnectionState>,
    attempt: Mutex<Attempt>,
}

#[derive(Clone)]
pub struct SpotifyConnector {
    inner: Arc<Inner>,
}

impl SpotifyConnector {
    /// Must be called from within a Tokio runtime; attempts run on it.
    pub fn new(app_remote: Arc<dyn SpotifyAppRemote>, params: ConnectionParams) -> Self {
        Self {
            inner: Arc::new(Inner {
                app_remote,
                params,
                runtime: Handle::current(),
                state: Signal::new(SpotifyConnectionState::Disconnected { error: None }),
                attempt: Mutex::new(Attempt::default()),
            }),
        }
    }

    pub fn state(&self) -> Observer<SpotifyConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> SpotifyConnectionState {
        self.inner.state.get()
    }

    pub fn is_installed(&self) -> bool {
        self.inner.app_remote.is_installed()
    }

    /// Start connecting unless connected or already connecting. The outcome
    /// is only observable through [`SpotifyConnector::state`].
    pub fn connect(&self) {
        self.connect_after(Teardown::default());
    }

    /// Like [`SpotifyConnector::connect`], but the native connect waits for
    /// `after`.
    pub fn connect_after(&self, after: Teardown) {
        let generation = {
            let mut attempt = lock(&self.inner.attempt);
            if attempt.pending
                || matches!(self.inner.state.get(), SpotifyConnectionState::Connected(_))
            {
                debug!("Spotify connect ignored, attempt in progress or connected");
                return;
            }
            attempt.generation += 1;
            attempt.pending = true;
            self.inner
                .state
                .publisher()
                .publish(SpotifyConnectionState::Disconnected { error: None });
            attempt.generation
        };

        debug!(generation, "connecting to Spotify");
        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            after.finished().await;
            let app_remote = inner.app_remote.clone();
            let params = inner.params.clone();
            let on_lost = inner.connection_lost_handler(generation);
            let result =
                tokio::task::spawn_blocking(move || app_remote.connect(&params, on_lost)).await;
            inner.finish(generation, result);
        });
    }

    pub fn disconnect(&self) -> Teardown {
        self.inner.release(|remote| remote.disconnect())
    }

    /// Disconnect after pausing playback, so the next service does not play
    /// over this one.
    pub fn hand_off(&self) -> Teardown {
        self.inner.release(|remote| {
            if let Err(error) = remote.pause() {
                debug!(%error, "pause before Spotify hand-off failed");
            }
            remote.disconnect();
        })
    }

    pub fn phase(&self) -> AdapterPhase {
        if lock(&self.inner.attempt).pending {
            return AdapterPhase::Connecting;
        }
        match self.inner.state.get() {
            SpotifyConnectionState::Connected(_) => AdapterPhase::Live,
            SpotifyConnectionState::FailedToConnect(_)
            | SpotifyConnectionState::Disconnected { error: Some(_) } => AdapterPhase::Failed,
            SpotifyConnectionState::Disconnected { error: None } => AdapterPhase::Idle,
        }
    }
}

impl Inner {
    fn connection_lost_handler(self: &Arc<Self>, generation: u64) -> ConnectionLost {
        let inner = Arc::downgrade(self);
        Box::new(move |error| {
            if let Some(inner) = inner.upgrade() {
                inner.connection_lost(generation, error);
            }
        })
    }

    fn finish(
        &self,
        generation: u64,
        result: Result<Result<Arc<dyn SpotifyRemote>, SpotifyNativeError>, JoinError>,
    ) {
        let mut attempt = lock(&self.attempt);
        if attempt.generation != generation || !attempt.pending {
            drop(attempt);
            if let Ok(Ok(remote)) = result {
                debug!(generation, "closing Spotify connection of an abandoned attempt");
                self.runtime.spawn_blocking(move || remote.disconnect());
            }
            return;
        }
        attempt.pending = false;

        let state = match result {
            Ok(Ok(remote)) => {
                let session = Session::new(PlayerService::Spotify, remote, playback_signal);
                info!(session = session.id(), "connected to Spotify");
                SpotifyConnectionState::Connected(session)
            }
            Ok(Err(error)) => {
                warn!(%error, "Spotify connection failed");
                SpotifyConnectionState::FailedToConnect(error.into())
            }
            Err(error) => {
                warn!(%error, "Spotify connection task failed");
                SpotifyConnectionState::FailedToConnect(ConnectError::Unknown)
            }
        };
        self.state.publisher().publish(state);
    }

    fn connection_lost(&self, generation: u64, error: SpotifyNativeError) {
        let attempt = lock(&self.attempt);
        if attempt.generation != generation {
            return;
        }
        if let SpotifyConnectionState::Connected(session) = self.state.get() {
            warn!(%error, session = session.id(), "Spotify connection lost");
            let _ = session.retire(&self.runtime, |remote| remote.disconnect());
            self.state
                .publisher()
                .publish(SpotifyConnectionState::Disconnected {
                    error: Some(error.into()),
                });
        }
    }

    fn release<F>(&self, release: F) -> Teardown
    where
        F: FnOnce(&(dyn SpotifyRemote + 'static)) + Send + 'static,
    {
        let mut attempt = lock(&self.attempt);
        attempt.generation += 1;
        attempt.pending = false;
        let teardown = match self.state.get() {
            SpotifyConnectionState::Connected(session) => {
                Teardown::of(session.retire(&self.runtime, release))
            }
            _ => Teardown::default(),
        };
        self.state
            .publisher()
            .publish(SpotifyConnectionState::Disconnected { error: None });
        teardown
    }
}

/// Playback signal of one connection. The native player-state subscription
/// exists only while someone observes it and never outlives the session.
fn playback_signal(session: Weak<SpotifySession>) -> Signal<Option<PlaybackState>> {
    Signal::gated(None, move |active, publisher| {
        let Some(session) = session.upgrade() else {
            return;
        };
        if !active {
            session.detach();
            return;
        }
        let publisher = publisher.clone();
        session.attach(move |remote| {
            let subscription = remote.subscribe_to_player_state(Box::new(move |state| {
                publisher.publish(Some(PlaybackState::from(state)));
            }));
            Box::new(move || subscription.cancel())
        });
    })
}

impl PlatformAdapter for SpotifyConnector {
    fn service(&self) -> PlayerService {
        PlayerService::Spotify
    }

    fn phase(&self) -> AdapterPhase {
        SpotifyConnector::phase(self)
    }

    fn is_installed(&self) -> bool {
        SpotifyConnector::is_installed(self)
    }

    fn connect_after(&self, after: Teardown) {
        SpotifyConnector::connect_after(self, after)
    }

    fn disconnect(&self) -> Teardown {
        SpotifyConnector::disconnect(self)
    }

    fn hand_off(&self) -> Teardown {
        SpotifyConnector::hand_off(self)
    }
}

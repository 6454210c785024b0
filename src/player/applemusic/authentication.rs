//! Apple Music authorization and controller lifecycle.

use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use super::controller::{
    Authorization, ConnectIntent, MediaItem, MusicKit, MusicPlayerController,
    MusicPlayerListener, TokenError,
};
use super::player::{snapshot, AppleMusicSession};
use crate::player::adapter::{AdapterPhase, PlatformAdapter, Teardown};
use crate::player::auth::{AuthProvider, DeveloperToken, MusicUserToken};
use crate::player::session::Session;
use crate::player::signal::{lock, Observer, Publisher, Signal};
use crate::player::{ConnectError, PlaybackState, PlayerService};

const INTENT_BUFFER: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppleMusicAuthenticationStatus {
    /// Idle, or waiting for MusicKit or for the user.
    NotDetermined,
    Success(Arc<AppleMusicSession>),
    Error(ConnectError),
}

enum Step {
    Ready(Arc<dyn MusicPlayerController>),
    AwaitUser(DeveloperToken, ConnectIntent),
}

#[derive(Default)]
struct Attempt {
    generation: u64,
    pending: bool,
    // Set while the host presents an authorization flow.
    awaiting_user: Option<DeveloperToken>,
}

struct Inner {
    music_kit: Arc<dyn MusicKit>,
    auth: Arc<dyn AuthProvider>,
    runtime: Handle,
    status: Signal<AppleMusicAuthenticationStatus>,
    attempt: Mutex<Attempt>,
    intents: broadcast::Sender<ConnectIntent>,
}

#[derive(Clone)]
pub struct AppleMusicAuthentication {
    inner: Arc<Inner>,
}

impl AppleMusicAuthentication {
    /// Must be called from within a Tokio runtime; attempts run on it.
    pub fn new(music_kit: Arc<dyn MusicKit>, auth: Arc<dyn AuthProvider>) -> Self {
        let (intents, _) = broadcast::channel(INTENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                music_kit,
                auth,
                runtime: Handle::current(),
                status: Signal::new(AppleMusicAuthenticationStatus::NotDetermined),
                attempt: Mutex::new(Attempt::default()),
                intents,
            }),
        }
    }

    pub fn status(&self) -> Observer<AppleMusicAuthenticationStatus> {
        self.inner.status.subscribe()
    }

    pub fn current(&self) -> AppleMusicAuthenticationStatus {
        self.inner.status.get()
    }

    pub fn is_installed(&self) -> bool {
        self.inner.music_kit.is_installed()
    }

    /// Authorization flows the host must present to the user. Report the
    /// outcome through [`AppleMusicAuthentication::handle_authorization`].
    pub fn intents(&self) -> broadcast::Receiver<ConnectIntent> {
        self.inner.intents.subscribe()
    }

    pub fn connect(&self) {
        self.connect_after(Teardown::default());
    }

    /// Like [`AppleMusicAuthentication::connect`], but MusicKit is only
    /// contacted once `after` has finished.
    pub fn connect_after(&self, after: Teardown) {
        let generation = {
            let mut attempt = lock(&self.inner.attempt);
            if attempt.pending
                || matches!(
                    self.inner.status.get(),
                    AppleMusicAuthenticationStatus::Success(_)
                )
            {
                debug!("Apple Music connect ignored, attempt in progress or connected");
                return;
            }
            attempt.generation += 1;
            attempt.pending = true;
            self.inner
                .status
                .publisher()
                .publish(AppleMusicAuthenticationStatus::NotDetermined);
            attempt.generation
        };

        debug!(generation, "connecting to Apple Music");
        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            after.finished().await;
            let music_kit = inner.music_kit.clone();
            let auth = inner.auth.clone();
            let result = tokio::task::spawn_blocking(move || authorize(&*music_kit, &*auth)).await;
            inner.finish(generation, result);
        });
    }

    /// Complete an authorization flow announced on [`AppleMusicAuthentication::intents`].
    pub fn handle_authorization(&self, result: Result<MusicUserToken, TokenError>) {
        let mut attempt = lock(&self.inner.attempt);
        let Some(developer_token) = attempt.awaiting_user.take() else {
            debug!("no Apple Music authorization pending");
            return;
        };
        let user_token = match result {
            Ok(user_token) => user_token,
            Err(error) => {
                warn!(%error, "Apple Music authorization failed");
                attempt.pending = false;
                self.inner
                    .status
                    .publisher()
                    .publish(AppleMusicAuthenticationStatus::Error(error.into()));
                return;
            }
        };
        let generation = attempt.generation;
        drop(attempt);

        let inner = self.inner.clone();
        self.inner.runtime.spawn(async move {
            let music_kit = inner.music_kit.clone();
            let result = tokio::task::spawn_blocking(move || {
                music_kit
                    .create_controller(&developer_token, &user_token)
                    .map(Step::Ready)
                    .map_err(ConnectError::from)
            })
            .await;
            inner.finish(generation, result);
        });
    }

    pub fn disconnect(&self) -> Teardown {
        self.inner.release(|controller| controller.release())
    }

    /// Stop playback, then release the controller.
    pub fn hand_off(&self) -> Teardown {
        self.inner.release(|controller| {
            if let Err(error) = controller.stop() {
                debug!(%error, "stop before Apple Music hand-off failed");
            }
            controller.release();
        })
    }

    pub fn phase(&self) -> AdapterPhase {
        if lock(&self.inner.attempt).pending {
            return AdapterPhase::Connecting;
        }
        match self.inner.status.get() {
            AppleMusicAuthenticationStatus::Success(_) => AdapterPhase::Live,
            AppleMusicAuthenticationStatus::Error(_) => AdapterPhase::Failed,
            AppleMusicAuthenticationStatus::NotDetermined => AdapterPhase::Idle,
        }
    }
}

fn authorize(music_kit: &dyn MusicKit, auth: &dyn AuthProvider) -> Result<Step, ConnectError> {
    if !music_kit.is_installed() {
        return Err(ConnectError::NotInstalled);
    }
    let developer_token = match auth.apple_music_developer_token() {
        Some(token) => token,
        None if !music_kit.requires_developer_token() => DeveloperToken(String::new()),
        None => return Err(ConnectError::AuthError),
    };
    match music_kit.authorize(&developer_token) {
        Authorization::Granted(user_token) => music_kit
            .create_controller(&developer_token, &user_token)
            .map(Step::Ready)
            .map_err(ConnectError::from),
        Authorization::RequiresUser(intent) => Ok(Step::AwaitUser(developer_token, intent)),
        Authorization::Denied(error) => Err(error.into()),
    }
}

impl Inner {
    fn finish(&self, generation: u64, result: Result<Result<Step, ConnectError>, JoinError>) {
        let mut attempt = lock(&self.attempt);
        if attempt.generation != generation || !attempt.pending {
            drop(attempt);
            if let Ok(Ok(Step::Ready(controller))) = result {
                debug!(generation, "releasing Apple Music controller of an abandoned attempt");
                self.runtime.spawn_blocking(move || controller.release());
            }
            return;
        }

        let status = match result {
            Ok(Ok(Step::Ready(controller))) => {
                let runtime = self.runtime.clone();
                let session = Session::new(PlayerService::AppleMusic, controller, |session| {
                    playback_signal(session, runtime)
                });
                info!(session = session.id(), "connected to Apple Music");
                AppleMusicAuthenticationStatus::Success(session)
            }
            Ok(Ok(Step::AwaitUser(developer_token, intent))) => {
                attempt.awaiting_user = Some(developer_token);
                info!(url = %intent.url, "Apple Music needs user authorization");
                if self.intents.send(intent).is_err() {
                    warn!("nobody is listening for Apple Music authorization requests");
                }
                return;
            }
            Ok(Err(error)) => {
                warn!(%error, "Apple Music connection failed");
                AppleMusicAuthenticationStatus::Error(error)
            }
            Err(error) => {
                warn!(%error, "Apple Music connection task failed");
                AppleMusicAuthenticationStatus::Error(ConnectError::Unknown)
            }
        };
        attempt.pending = false;
        self.status.publisher().publish(status);
    }

    fn release<F>(&self, release: F) -> Teardown
    where
        F: FnOnce(&(dyn MusicPlayerController + 'static)) + Send + 'static,
    {
        let mut attempt = lock(&self.attempt);
        attempt.generation += 1;
        attempt.pending = false;
        attempt.awaiting_user = None;
        let teardown = match self.status.get() {
            AppleMusicAuthenticationStatus::Success(session) => {
                Teardown::of(session.retire(&self.runtime, release))
            }
            _ => Teardown::default(),
        };
        self.status
            .publisher()
            .publish(AppleMusicAuthenticationStatus::NotDetermined);
        teardown
    }
}

/// Republishes a full snapshot whenever MusicKit reports any change. The
/// snapshot is read on the blocking pool, serialized with the session's other
/// native calls.
struct SnapshotListener {
    session: Weak<AppleMusicSession>,
    publisher: Publisher<Option<PlaybackState>>,
    runtime: Handle,
}

impl SnapshotListener {
    fn refresh(&self) {
        let session = self.session.clone();
        let publisher = self.publisher.clone();
        self.runtime.spawn_blocking(move || {
            if let Some(session) = session.upgrade() {
                session.with_handle(|controller| publisher.publish(Some(snapshot(controller))));
            }
        });
    }
}

impl MusicPlayerListener for SnapshotListener {
    fn on_playback_state_changed(&self, _state: i32) {
        self.refresh();
    }

    fn on_current_item_changed(&self, _item: Option<&MediaItem>) {
        self.refresh();
    }

    fn on_metadata_updated(&self, _item: &MediaItem) {
        self.refresh();
    }
}

/// Playback signal of one controller. The listener is registered only while
/// someone observes and is removed before the controller is released;
/// MusicKit does not replay, so activation also takes an initial snapshot.
fn playback_signal(
    session: Weak<AppleMusicSession>,
    runtime: Handle,
) -> Signal<Option<PlaybackState>> {
    Signal::gated(None, move |active, publisher| {
        let Some(session) = session.upgrade() else {
            return;
        };
        if !active {
            session.detach();
            return;
        }
        let listener = Arc::new(SnapshotListener {
            session: Arc::downgrade(&session),
            publisher: publisher.clone(),
            runtime: runtime.clone(),
        });
        let registered: Arc<dyn MusicPlayerListener> = listener.clone();
        session.attach(move |controller| {
            controller.add_listener(registered.clone());
            let controller = controller.clone();
            Box::new(move || controller.remove_listener(&registered))
        });
        listener.refresh();
    })
}

impl PlatformAdapter for AppleMusicAuthentication {
    fn service(&self) -> PlayerService {
        PlayerService::AppleMusic
    }

    fn phase(&self) -> AdapterPhase {
        AppleMusicAuthentication::phase(self)
    }

    fn is_installed(&self) -> bool {
        AppleMusicAuthentication::is_installed(self)
    }

    fn connect_after(&self, after: Teardown) {
        AppleMusicAuthentication::connect_after(self, after)
    }

    fn disconnect(&self) -> Teardown {
        AppleMusicAuthentication::disconnect(self)
    }

    fn hand_off(&self) -> Teardown {
        AppleMusicAuthentication::hand_off(self)
    }
}

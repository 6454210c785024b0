//! Ownership of one native vendor session.
//!
//! A [`Session`] is created on every successful connect and retired on
//! disconnect, error or connection loss. Façades hold it through an `Arc` and
//! check liveness before every call, so a retired native handle is never used.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::sync::watch;

use super::signal::{lock, Observer, Signal};
use super::{PlaybackState, PlayerError, PlayerService};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Undoes one native listener registration.
pub(crate) type Detach = Box<dyn FnOnce() + Send>;

pub struct Session<H: ?Sized> {
    id: u64,
    service: PlayerService,
    handle: Arc<H>,
    live: watch::Sender<bool>,
    // Serializes native calls; vendor SDKs are not assumed reentrant.
    calls: Mutex<()>,
    // The native playback listener, while one is attached.
    listener: Mutex<Option<Detach>>,
    playback: Signal<Option<PlaybackState>>,
}

impl<H: ?Sized + Send + Sync + 'static> Session<H> {
    /// `playback` builds the session's playback signal; its activity hook
    /// gets a weak reference back to the session for [`Session::attach`].
    pub(crate) fn new<F>(service: PlayerService, handle: Arc<H>, playback: F) -> Arc<Self>
    where
        F: FnOnce(Weak<Self>) -> Signal<Option<PlaybackState>>,
    {
        let (live, _) = watch::channel(true);
        Arc::new_cyclic(|session| Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            service,
            handle,
            live,
            calls: Mutex::new(()),
            listener: Mutex::new(None),
            playback: playback(session.clone()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn service(&self) -> PlayerService {
        self.service
    }

    pub fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    /// Run a native call on the blocking pool, serialized with other calls on
    /// this session. Fails with [`PlayerError::Inactive`] once retired.
    pub(crate) async fn call<R, E, F>(self: &Arc<Self>, f: F) -> Result<R, PlayerError>
    where
        R: Send + 'static,
        E: Into<PlayerError>,
        F: FnOnce(&H) -> Result<R, E> + Send + 'static,
    {
        if !self.is_live() {
            return Err(PlayerError::Inactive(self.service));
        }
        let session = self.clone();
        tokio::task::spawn_blocking(move || {
            let _serial = lock(&session.calls);
            if !session.is_live() {
                return Err(PlayerError::Inactive(session.service));
            }
            f(&*session.handle).map_err(Into::into)
        })
        .await?
    }

    /// Run `f` against the native handle on the calling thread, serialized with
    /// other calls. `None` once retired.
    pub(crate) fn with_handle<R>(&self, f: impl FnOnce(&H) -> R) -> Option<R> {
        let _serial = lock(&self.calls);
        if !self.is_live() {
            return None;
        }
        Some(f(&self.handle))
    }

    /// Register a native playback listener. `attach` returns how to remove it
    /// again, which happens on [`Session::detach`] or, at the latest, right
    /// before the handle is released. Does nothing once retired.
    pub(crate) fn attach(&self, attach: impl FnOnce(&Arc<H>) -> Detach) {
        let _serial = lock(&self.calls);
        if !self.is_live() {
            return;
        }
        let detach = attach(&self.handle);
        if let Some(previous) = lock(&self.listener).replace(detach) {
            previous();
        }
    }

    pub(crate) fn detach(&self) {
        let _serial = lock(&self.calls);
        // Once retired, the release task owns the listener.
        if !self.is_live() {
            return;
        }
        if let Some(detach) = lock(&self.listener).take() {
            detach();
        }
    }

    /// Mark the session dead, then detach the playback listener and run
    /// `release` against the native handle in the background. Returns
    /// immediately; only the first call has effect and gets the handle of the
    /// release task.
    pub(crate) fn retire<F>(
        self: &Arc<Self>,
        runtime: &Handle,
        release: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(&H) + Send + 'static,
    {
        if !self.live.send_replace(false) {
            return None;
        }
        tracing::debug!(service = %self.service, session = self.id, "session retired");
        let session = self.clone();
        Some(runtime.spawn_blocking(move || {
            let _serial = lock(&session.calls);
            if let Some(detach) = lock(&session.listener).take() {
                detach();
            }
            release(&*session.handle);
        }))
    }

    pub(crate) fn observe(self: &Arc<Self>) -> Result<PlaybackUpdates, PlayerError> {
        if !self.is_live() {
            return Err(PlayerError::Inactive(self.service));
        }
        Ok(PlaybackUpdates {
            states: self.playback.subscribe(),
            live: self.live.subscribe(),
            first: true,
        })
    }
}

impl<H: ?Sized> PartialEq for Session<H> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<H: ?Sized> Eq for Session<H> {}

impl<H: ?Sized> fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("service", &self.service)
            .field("live", &*self.live.borrow())
            .finish()
    }
}

/// Conflated playback updates of one session.
///
/// Holding this keeps the native playback listener attached until the
/// session is retired, which also ends the stream.
pub struct PlaybackUpdates {
    states: Observer<Option<PlaybackState>>,
    live: watch::Receiver<bool>,
    first: bool,
}

impl PlaybackUpdates {
    /// Next playback state. The first call returns the current state as soon
    /// as one is known; later calls wait for a newer one. `None` once the
    /// session is gone.
    pub async fn next(&mut self) -> Option<PlaybackState> {
        loop {
            if !*self.live.borrow() {
                return None;
            }
            if self.first || self.states.has_changed() {
                self.first = false;
                if let Some(state) = self.states.latest() {
                    return Some(state);
                }
            }
            tokio::select! {
                _ = self.states.changed() => {}
                _ = retired(&mut self.live) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl futures::Stream<Item = PlaybackState> {
        futures::stream::unfold(self, |mut updates| async move {
            let state = updates.next().await?;
            Some((state, updates))
        })
    }
}

async fn retired(live: &mut watch::Receiver<bool>) {
    let _ = live.wait_for(|live| !*live).await;
}

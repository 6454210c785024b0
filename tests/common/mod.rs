//! In-memory vendor SDKs. Every native call is appended to a shared log so
//! tests can assert on ordering across both services.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use motif::player::applemusic::{
    AppleMusicAuthentication, Authorization, ConnectIntent, MediaItem, MusicKit, MusicKitError,
    MusicPlayerController, MusicPlayerListener, TokenError,
};
use motif::player::auth::{AuthProvider, DeveloperToken, MusicUserToken, SpotifyAccessToken};
use motif::player::spotify::remote::{
    ConnectionLost, NativeSubscription, PlayerStateCallback, SpotifyAlbum, SpotifyArtist,
    SpotifyNativeError, SpotifyPlayerOptions, SpotifyPlayerState, SpotifyRepeat, SpotifyTrack,
};
use motif::player::spotify::{
    ConnectionParams, ImageDimension, SpotifyAppRemote, SpotifyConnector, SpotifyRemote,
};
use motif::player::PlayerNegotiation;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, future)
        .await
        .expect("timed out waiting")
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub async fn wait_for(&self, entry: &str) {
        within(async {
            while self.position(entry).is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
    }
}

/// Holds native connects until the test lets them through.
#[derive(Clone, Default)]
pub struct Gate(Arc<(Mutex<(usize, bool)>, Condvar)>);

impl Gate {
    pub fn opened() -> Self {
        let gate = Self::default();
        gate.open();
        gate
    }

    /// Let exactly one waiting (or future) connect through.
    pub fn allow_one(&self) {
        let (state, wake) = &*self.0;
        state.lock().unwrap().0 += 1;
        wake.notify_all();
    }

    pub fn open(&self) {
        let (state, wake) = &*self.0;
        state.lock().unwrap().1 = true;
        wake.notify_all();
    }

    fn pass(&self) {
        let (state, wake) = &*self.0;
        let mut state = state.lock().unwrap();
        loop {
            if state.1 {
                return;
            }
            if state.0 > 0 {
                state.0 -= 1;
                return;
            }
            state = wake.wait(state).unwrap();
        }
    }
}

pub struct FakeAuth {
    pub developer_token: Option<String>,
}

impl AuthProvider for FakeAuth {
    fn apple_music_developer_token(&self) -> Option<DeveloperToken> {
        self.developer_token.clone().map(DeveloperToken)
    }

    fn spotify_access_token(&self) -> Option<SpotifyAccessToken> {
        None
    }
}

// Spotify

pub fn spotify_track(name: &str) -> SpotifyTrack {
    let artist = SpotifyArtist {
        name: "Artist".to_string(),
        uri: "spotify:artist:1".to_string(),
    };
    SpotifyTrack {
        name: name.to_string(),
        uri: format!("spotify:track:{name}"),
        artist: artist.clone(),
        artists: vec![artist],
        album: SpotifyAlbum {
            name: "Album".to_string(),
            uri: "spotify:album:1".to_string(),
        },
        duration: 200_000,
        image_uri: Some("spotify:image:1".to_string()),
        is_episode: false,
        is_podcast: false,
    }
}

pub fn spotify_state(track: Option<SpotifyTrack>, is_paused: bool, position: u64) -> SpotifyPlayerState {
    SpotifyPlayerState {
        track,
        is_paused,
        playback_speed: if is_paused { 0.0 } else { 1.0 },
        playback_position: position,
        playback_options: Some(SpotifyPlayerOptions {
            is_shuffling: false,
            repeat_mode: SpotifyRepeat::Off,
        }),
    }
}

pub struct FakeSpotify {
    pub log: Log,
    pub gate: Gate,
    pub installed: bool,
    refuse: Mutex<Option<SpotifyNativeError>>,
    remotes: Mutex<Vec<Arc<FakeRemote>>>,
    lost: Mutex<Option<ConnectionLost>>,
}

impl FakeSpotify {
    pub fn new(log: Log, gate: Gate) -> Arc<Self> {
        Arc::new(Self {
            log,
            gate,
            installed: true,
            refuse: Mutex::new(None),
            remotes: Mutex::new(Vec::new()),
            lost: Mutex::new(None),
        })
    }

    /// The next connect fails with `error`.
    pub fn refuse_next(&self, error: SpotifyNativeError) {
        *self.refuse.lock().unwrap() = Some(error);
    }

    pub fn remote(&self) -> Arc<FakeRemote> {
        self.remotes.lock().unwrap().last().cloned().expect("no connection made")
    }

    pub fn connections(&self) -> usize {
        self.remotes.lock().unwrap().len()
    }

    /// Simulate the App Remote dropping the connection.
    pub fn lose_connection(&self, error: SpotifyNativeError) {
        let lost = self.lost.lock().unwrap();
        (lost.as_ref().expect("never connected"))(error);
    }
}

impl SpotifyAppRemote for FakeSpotify {
    fn is_installed(&self) -> bool {
        self.installed
    }

    fn connect(
        &self,
        _params: &ConnectionParams,
        on_lost: ConnectionLost,
    ) -> Result<Arc<dyn SpotifyRemote>, SpotifyNativeError> {
        self.log.push("spotify.connect");
        self.gate.pass();
        if let Some(error) = self.refuse.lock().unwrap().take() {
            return Err(error);
        }
        let remote = FakeRemote::new(self.log.clone());
        self.remotes.lock().unwrap().push(remote.clone());
        *self.lost.lock().unwrap() = Some(on_lost);
        self.log.push("spotify.connected");
        Ok(remote)
    }
}

pub struct FakeRemote {
    log: Log,
    state: Mutex<SpotifyPlayerState>,
    callback: Arc<Mutex<Option<PlayerStateCallback>>>,
    subscriptions: Arc<AtomicUsize>,
}

impl FakeRemote {
    fn new(log: Log) -> Arc<Self> {
        Arc::new(Self {
            log,
            state: Mutex::new(spotify_state(None, true, 0)),
            callback: Arc::new(Mutex::new(None)),
            subscriptions: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Push a player state the way the App Remote does.
    pub fn emit(&self, state: SpotifyPlayerState) {
        *self.state.lock().unwrap() = state.clone();
        if let Some(callback) = self.callback.lock().unwrap().as_ref() {
            callback(state);
        }
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

impl SpotifyRemote for FakeRemote {
    fn player_state(&self) -> Result<SpotifyPlayerState, SpotifyNativeError> {
        Ok(self.state.lock().unwrap().clone())
    }

    fn subscribe_to_player_state(&self, callback: PlayerStateCallback) -> NativeSubscription {
        self.log.push("spotify.subscribe");
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        // The SDK delivers the current state right away.
        callback(self.state.lock().unwrap().clone());
        *self.callback.lock().unwrap() = Some(callback);

        let slot = self.callback.clone();
        let subscriptions = self.subscriptions.clone();
        let log = self.log.clone();
        NativeSubscription::new(move || {
            log.push("spotify.unsubscribe");
            slot.lock().unwrap().take();
            subscriptions.fetch_sub(1, Ordering::SeqCst);
        })
    }

    fn play(&self, uri: &str) -> Result<(), SpotifyNativeError> {
        self.log.push(format!("spotify.play {uri}"));
        Ok(())
    }

    fn resume(&self) -> Result<(), SpotifyNativeError> {
        self.log.push("spotify.resume");
        Ok(())
    }

    fn pause(&self) -> Result<(), SpotifyNativeError> {
        self.log.push("spotify.pause");
        Ok(())
    }

    fn skip_next(&self) -> Result<(), SpotifyNativeError> {
        self.log.push("spotify.skip_next");
        Ok(())
    }

    fn skip_previous(&self) -> Result<(), SpotifyNativeError> {
        self.log.push("spotify.skip_previous");
        Ok(())
    }

    fn set_shuffle(&self, enabled: bool) -> Result<(), SpotifyNativeError> {
        self.log.push(format!("spotify.shuffle {enabled}"));
        Ok(())
    }

    fn set_repeat(&self, mode: SpotifyRepeat) -> Result<(), SpotifyNativeError> {
        self.log.push(format!("spotify.repeat {mode:?}"));
        Ok(())
    }

    fn seek_to(&self, position_ms: u64) -> Result<(), SpotifyNativeError> {
        self.log.push(format!("spotify.seek {position_ms}"));
        Ok(())
    }

    fn image(&self, _uri: &str, _dimension: ImageDimension) -> Result<Vec<u8>, SpotifyNativeError> {
        Err(SpotifyNativeError::Unsupported)
    }

    fn disconnect(&self) {
        // Slow enough that a connect racing the release would show up in the log.
        std::thread::sleep(Duration::from_millis(30));
        self.log.push("spotify.disconnect");
    }
}

// Apple Music

#[derive(Debug, Clone)]
pub enum AuthMode {
    Granted,
    RequiresUser,
    Denied(TokenError),
}

pub fn media_item(title: &str) -> MediaItem {
    MediaItem {
        store_id: Some(format!("id-{title}")),
        title: Some(title.to_string()),
        album_title: Some("Album".to_string()),
        artist_name: Some("Artist".to_string()),
        album_artist_name: None,
        duration: 180_000,
        artwork_url: Some("https://example.com/{w}x{h}.jpg".to_string()),
    }
}

pub struct FakeMusicKit {
    pub log: Log,
    pub gate: Gate,
    pub installed: bool,
    pub mode: Mutex<AuthMode>,
    controllers: Mutex<Vec<Arc<FakeController>>>,
}

impl FakeMusicKit {
    pub fn new(log: Log, gate: Gate) -> Arc<Self> {
        Arc::new(Self {
            log,
            gate,
            installed: true,
            mode: Mutex::new(AuthMode::Granted),
            controllers: Mutex::new(Vec::new()),
        })
    }

    pub fn set_mode(&self, mode: AuthMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn controller(&self) -> Arc<FakeController> {
        self.controllers.lock().unwrap().last().cloned().expect("no controller created")
    }
}

impl MusicKit for FakeMusicKit {
    fn is_installed(&self) -> bool {
        self.installed
    }

    fn authorize(&self, _developer_token: &DeveloperToken) -> Authorization {
        self.log.push("apple.authorize");
        self.gate.pass();
        match self.mode.lock().unwrap().clone() {
            AuthMode::Granted => Authorization::Granted(MusicUserToken("user".to_string())),
            AuthMode::RequiresUser => Authorization::RequiresUser(ConnectIntent {
                url: "music://authorize".to_string(),
            }),
            AuthMode::Denied(error) => Authorization::Denied(error),
        }
    }

    fn create_controller(
        &self,
        _developer_token: &DeveloperToken,
        user_token: &MusicUserToken,
    ) -> Result<Arc<dyn MusicPlayerController>, TokenError> {
        self.log.push(format!("apple.create_controller {}", user_token.0));
        let controller = FakeController::new(self.log.clone());
        self.controllers.lock().unwrap().push(controller.clone());
        Ok(controller)
    }
}

pub struct FakeController {
    log: Log,
    state: Mutex<(i32, Option<MediaItem>)>,
    listeners: Mutex<Vec<Arc<dyn MusicPlayerListener>>>,
    // Every listener ever added, to fire callbacks that were already in flight.
    seen: Mutex<Vec<Arc<dyn MusicPlayerListener>>>,
}

impl FakeController {
    fn new(log: Log) -> Arc<Self> {
        Arc::new(Self {
            log,
            state: Mutex::new((0, None)),
            listeners: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn listeners(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Change state and fire the burst of callbacks MusicKit fires.
    pub fn emit(&self, code: i32, item: Option<MediaItem>) {
        *self.state.lock().unwrap() = (code, item.clone());
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_playback_state_changed(code);
            listener.on_current_item_changed(item.as_ref());
            if let Some(item) = &item {
                listener.on_metadata_updated(item);
            }
        }
    }

    /// Fire a callback on every listener ever added, removed or not.
    pub fn emit_late(&self, code: i32) {
        let listeners = self.seen.lock().unwrap().clone();
        for listener in listeners {
            listener.on_playback_state_changed(code);
        }
    }
}

impl MusicPlayerController for FakeController {
    fn current_item(&self) -> Option<MediaItem> {
        self.state.lock().unwrap().1.clone()
    }

    fn playback_state(&self) -> i32 {
        self.log.push("apple.read");
        self.state.lock().unwrap().0
    }

    fn playback_position(&self) -> u64 {
        1_000
    }

    fn repeat_mode(&self) -> i32 {
        0
    }

    fn shuffle_mode(&self) -> i32 {
        0
    }

    fn play(&self) -> Result<(), MusicKitError> {
        self.log.push("apple.play");
        Ok(())
    }

    fn pause(&self) -> Result<(), MusicKitError> {
        self.log.push("apple.pause");
        Ok(())
    }

    fn stop(&self) -> Result<(), MusicKitError> {
        self.log.push("apple.stop");
        Ok(())
    }

    fn skip_to_next_item(&self) -> Result<(), MusicKitError> {
        self.log.push("apple.next");
        Ok(())
    }

    fn skip_to_previous_item(&self) -> Result<(), MusicKitError> {
        self.log.push("apple.previous");
        Ok(())
    }

    fn seek_to_position(&self, position_ms: u64) -> Result<(), MusicKitError> {
        self.log.push(format!("apple.seek {position_ms}"));
        Ok(())
    }

    fn set_repeat_mode(&self, code: i32) -> Result<(), MusicKitError> {
        self.log.push(format!("apple.repeat {code}"));
        Ok(())
    }

    fn set_shuffle_mode(&self, code: i32) -> Result<(), MusicKitError> {
        self.log.push(format!("apple.shuffle {code}"));
        Ok(())
    }

    fn set_queue(&self, store_ids: &[String], _play_when_ready: bool) -> Result<(), MusicKitError> {
        self.log.push(format!("apple.queue {}", store_ids.join(",")));
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn MusicPlayerListener>) {
        self.log.push("apple.add_listener");
        self.seen.lock().unwrap().push(listener.clone());
        self.listeners.lock().unwrap().push(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn MusicPlayerListener>) {
        self.log.push("apple.remove_listener");
        self.listeners
            .lock()
            .unwrap()
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }

    fn release(&self) {
        std::thread::sleep(Duration::from_millis(30));
        self.log.push("apple.release");
    }
}

/// Both fakes behind a negotiation, sharing one log.
pub struct Harness {
    pub log: Log,
    pub spotify: Arc<FakeSpotify>,
    pub music_kit: Arc<FakeMusicKit>,
    pub negotiation: PlayerNegotiation,
}

impl Harness {
    /// Connects pass straight through.
    pub fn new() -> Self {
        Self::with_gates(Gate::opened(), Gate::opened())
    }

    pub fn with_gates(spotify_gate: Gate, apple_gate: Gate) -> Self {
        let log = Log::default();
        let spotify = FakeSpotify::new(log.clone(), spotify_gate);
        let music_kit = FakeMusicKit::new(log.clone(), apple_gate);
        let auth = Arc::new(FakeAuth {
            developer_token: Some("developer".to_string()),
        });
        let negotiation = PlayerNegotiation::new(
            SpotifyConnector::new(spotify.clone(), params()),
            AppleMusicAuthentication::new(music_kit.clone(), auth),
        );
        Self {
            log,
            spotify,
            music_kit,
            negotiation,
        }
    }
}

impl Drop for Harness {
    // A connect still parked on a gate would keep the runtime from shutting down.
    fn drop(&mut self) {
        self.spotify.gate.open();
        self.music_kit.gate.open();
    }
}

pub fn params() -> ConnectionParams {
    ConnectionParams {
        client_id: "client".to_string(),
        redirect_uri: "motif://callback".to_string(),
        show_auth_view: false,
    }
}

/// Poll `condition` until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    within(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

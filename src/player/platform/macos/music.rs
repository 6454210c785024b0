//! Music.app driven through AppleScript, standing in for MusicKit.

use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use super::common::{is_app_installed, parse_real, run_script, tell, Poller, SEPARATOR};
use crate::player::applemusic::controller::codes;
use crate::player::applemusic::{
    Authorization, MediaItem, MusicKit, MusicKitError, MusicPlayerController, MusicPlayerListener,
    TokenError,
};
use crate::player::auth::{DeveloperToken, MusicUserToken};
use crate::player::signal::lock;

const APP: &str = "Music";

// Getters come in bursts; one script run serves them all.
const SNAPSHOT_TTL: Duration = Duration::from_millis(250);

const STATE_SCRIPT: &str = r#"
    tell application "Music"
        set tShuffle to shuffle enabled as string
        set tRepeat to song repeat as string
        set tState to player state as string
        if player state is stopped then
            return tState & "|||" & tShuffle & "|||" & tRepeat
        end if

        set tName to name of current track
        set tArtist to artist of current track
        set tAlbumArtist to album artist of current track
        set tAlbum to album of current track
        set tDuration to duration of current track
        set tPosition to player position

        return tState & "|||" & tShuffle & "|||" & tRepeat & "|||" & tName & "|||" & tArtist & "|||" & tAlbumArtist & "|||" & tAlbum & "|||" & tDuration & "|||" & tPosition
    end tell
"#;

fn script_error(error: anyhow::Error) -> MusicKitError {
    MusicKitError::Failed(error.to_string())
}

pub struct AppleScriptMusicKit {
    poll_interval: Duration,
}

impl AppleScriptMusicKit {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl MusicKit for AppleScriptMusicKit {
    fn is_installed(&self) -> bool {
        is_app_installed(APP)
    }

    fn requires_developer_token(&self) -> bool {
        false
    }

    // The local app plays with the signed-in account; there is no token flow.
    fn authorize(&self, _developer_token: &DeveloperToken) -> Authorization {
        match tell(APP, "launch") {
            Ok(_) => Authorization::Granted(MusicUserToken(String::new())),
            Err(error) => {
                tracing::warn!(%error, "could not launch Music");
                Authorization::Denied(TokenError::Unknown)
            }
        }
    }

    fn create_controller(
        &self,
        _developer_token: &DeveloperToken,
        _user_token: &MusicUserToken,
    ) -> Result<Arc<dyn MusicPlayerController>, TokenError> {
        Ok(ScriptController::new(self.poll_interval))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Snapshot {
    state: i32,
    repeat: i32,
    shuffle: i32,
    item: Option<MediaItem>,
    position_ms: u64,
}

struct Listening {
    listeners: Vec<Arc<dyn MusicPlayerListener>>,
    poller: Option<Poller>,
}

struct ScriptController {
    this: Weak<ScriptController>,
    poll_interval: Duration,
    cached: Mutex<Option<(Instant, Snapshot)>>,
    listening: Mutex<Listening>,
}

impl ScriptController {
    fn new(poll_interval: Duration) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            poll_interval,
            cached: Mutex::new(None),
            listening: Mutex::new(Listening {
                listeners: Vec::new(),
                poller: None,
            }),
        })
    }

    fn snapshot(&self) -> Snapshot {
        let mut cached = lock(&self.cached);
        if let Some((taken, snapshot)) = cached.as_ref() {
            if taken.elapsed() < SNAPSHOT_TTL {
                return snapshot.clone();
            }
        }
        let snapshot = self.read();
        *cached = Some((Instant::now(), snapshot.clone()));
        snapshot
    }

    fn read(&self) -> Snapshot {
        match run_script(STATE_SCRIPT) {
            Ok(output) => parse_snapshot(&output),
            Err(error) => {
                tracing::debug!(%error, "reading Music state failed");
                Snapshot::default()
            }
        }
    }

    fn command(&self, command: &str) -> Result<(), MusicKitError> {
        lock(&self.cached).take();
        tell(APP, command).map(drop).map_err(script_error)
    }

    /// One poll: notify listeners about what changed since `last`.
    fn poll(&self, last: &mut Snapshot) {
        let next = self.read();
        *lock(&self.cached) = Some((Instant::now(), next.clone()));
        if next == *last {
            return;
        }
        let listeners = lock(&self.listening).listeners.clone();
        for listener in &listeners {
            if next.state != last.state {
                listener.on_playback_state_changed(next.state);
            }
            if next.item != last.item {
                listener.on_current_item_changed(next.item.as_ref());
            } else if let Some(item) = &next.item {
                listener.on_metadata_updated(item);
            }
        }
        *last = next;
    }
}

impl MusicPlayerController for ScriptController {
    fn current_item(&self) -> Option<MediaItem> {
        self.snapshot().item
    }

    fn playback_state(&self) -> i32 {
        self.snapshot().state
    }

    fn playback_position(&self) -> u64 {
        self.snapshot().position_ms
    }

    fn repeat_mode(&self) -> i32 {
        self.snapshot().repeat
    }

    fn shuffle_mode(&self) -> i32 {
        self.snapshot().shuffle
    }

    fn play(&self) -> Result<(), MusicKitError> {
        self.command("play")
    }

    fn pause(&self) -> Result<(), MusicKitError> {
        self.command("pause")
    }

    fn stop(&self) -> Result<(), MusicKitError> {
        self.command("stop")
    }

    fn skip_to_next_item(&self) -> Result<(), MusicKitError> {
        self.command("next track")
    }

    fn skip_to_previous_item(&self) -> Result<(), MusicKitError> {
        self.command("previous track")
    }

    fn seek_to_position(&self, position_ms: u64) -> Result<(), MusicKitError> {
        let seconds = position_ms as f64 / 1000.0;
        self.command(&format!("set player position to {seconds}"))
    }

    fn set_repeat_mode(&self, code: i32) -> Result<(), MusicKitError> {
        let value = match code {
            codes::repeat::ONE => "one",
            codes::repeat::ALL => "all",
            _ => "off",
        };
        self.command(&format!("set song repeat to {value}"))
    }

    fn set_shuffle_mode(&self, code: i32) -> Result<(), MusicKitError> {
        let enabled = matches!(code, codes::shuffle::SONGS | codes::shuffle::ALBUMS);
        self.command(&format!("set shuffle enabled to {enabled}"))
    }

    fn set_queue(&self, _store_ids: &[String], _play_when_ready: bool) -> Result<(), MusicKitError> {
        // Catalog ids cannot be queued through AppleScript.
        Err(MusicKitError::Unsupported)
    }

    fn add_listener(&self, listener: Arc<dyn MusicPlayerListener>) {
        let mut listening = lock(&self.listening);
        listening.listeners.push(listener);
        if listening.poller.is_none() {
            let this = self.this.clone();
            let mut last = Snapshot::default();
            listening.poller = Poller::spawn("music-state", self.poll_interval, move || {
                if let Some(controller) = this.upgrade() {
                    controller.poll(&mut last);
                }
            });
        }
    }

    fn remove_listener(&self, listener: &Arc<dyn MusicPlayerListener>) {
        let mut listening = lock(&self.listening);
        listening
            .listeners
            .retain(|registered| !Arc::ptr_eq(registered, listener));
        if listening.listeners.is_empty() {
            listening.poller = None;
        }
    }

    fn release(&self) {
        let mut listening = lock(&self.listening);
        listening.listeners.clear();
        listening.poller = None;
    }
}

fn playback_code(state: &str) -> i32 {
    match state {
        "playing" => codes::playback::PLAYING,
        "paused" => codes::playback::PAUSED,
        "fast forwarding" => codes::playback::SEEKING_FORWARD,
        "rewinding" => codes::playback::SEEKING_BACKWARD,
        _ => codes::playback::STOPPED,
    }
}

fn parse_snapshot(output: &str) -> Snapshot {
    let parts: Vec<&str> = output.split(SEPARATOR).collect();
    if parts.len() < 3 {
        return Snapshot::default();
    }

    let mut snapshot = Snapshot {
        state: playback_code(parts[0]),
        shuffle: if parts[1] == "true" {
            codes::shuffle::SONGS
        } else {
            codes::shuffle::OFF
        },
        repeat: match parts[2] {
            "one" => codes::repeat::ONE,
            "all" => codes::repeat::ALL,
            _ => codes::repeat::OFF,
        },
        ..Snapshot::default()
    };

    if parts.len() >= 9 {
        let text = |value: &str| Some(value.to_string()).filter(|v| !v.is_empty());
        snapshot.item = Some(MediaItem {
            store_id: None,
            title: text(parts[3]),
            artist_name: text(parts[4]),
            album_artist_name: text(parts[5]),
            album_title: text(parts[6]),
            // Music reports seconds.
            duration: (parse_real(parts[7]) * 1000.0) as u64,
            artwork_url: None,
        });
        snapshot.position_ms = (parse_real(parts[8]) * 1000.0) as u64;
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playing() {
        let snapshot = parse_snapshot(
            "playing|||false|||all|||Teardrop|||Massive Attack||||||Mezzanine|||330,5|||61,25",
        );
        assert_eq!(snapshot.state, codes::playback::PLAYING);
        assert_eq!(snapshot.repeat, codes::repeat::ALL);
        assert_eq!(snapshot.shuffle, codes::shuffle::OFF);
        assert_eq!(snapshot.position_ms, 61_250);
        let item = snapshot.item.unwrap();
        assert_eq!(item.title.as_deref(), Some("Teardrop"));
        assert_eq!(item.album_artist_name, None);
        assert_eq!(item.duration, 330_500);
    }

    #[test]
    fn test_parse_stopped() {
        let snapshot = parse_snapshot("stopped|||true|||one");
        assert_eq!(snapshot.state, codes::playback::STOPPED);
        assert_eq!(snapshot.shuffle, codes::shuffle::SONGS);
        assert_eq!(snapshot.repeat, codes::repeat::ONE);
        assert!(snapshot.item.is_none());
    }

    #[test]
    fn test_playback_codes() {
        assert_eq!(playback_code("rewinding"), codes::playback::SEEKING_BACKWARD);
        assert_eq!(playback_code("paused"), codes::playback::PAUSED);
    }
}

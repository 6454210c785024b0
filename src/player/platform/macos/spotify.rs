//! Spotify desktop app driven through AppleScript.
//!
//! The desktop app has no App Remote, so "connecting" means the app is
//! installed and launched; connection loss is the app quitting. Player state
//! events come from polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::common::{
    is_app_installed, is_app_running, parse_real, quote, run_script, tell, Poller, SEPARATOR,
};
use crate::player::signal::lock;
use crate::player::spotify::remote::{
    ConnectionLost, ConnectionParams, ImageDimension, NativeSubscription, PlayerStateCallback,
    SpotifyAlbum, SpotifyAppRemote, SpotifyArtist, SpotifyNativeError, SpotifyPlayerOptions,
    SpotifyPlayerState, SpotifyRemote, SpotifyRepeat, SpotifyTrack,
};

const APP: &str = "Spotify";

const STATE_SCRIPT: &str = r#"
    tell application "Spotify"
        set tShuffle to shuffling as string
        set tRepeat to repeating as string
        if player state is stopped then
            return "STOPPED" & "|||" & tShuffle & "|||" & tRepeat
        end if

        set tName to name of current track
        set tArtist to artist of current track
        set tAlbum to album of current track
        set tDuration to duration of current track
        set tPosition to player position
        set tState to player state as string
        set tArtwork to artwork url of current track
        set tId to id of current track

        return tState & "|||" & tShuffle & "|||" & tRepeat & "|||" & tName & "|||" & tArtist & "|||" & tAlbum & "|||" & tDuration & "|||" & tPosition & "|||" & tArtwork & "|||" & tId
    end tell
"#;

fn script_error(error: anyhow::Error) -> SpotifyNativeError {
    SpotifyNativeError::Other(error.to_string())
}

pub struct AppleScriptSpotify {
    poll_interval: Duration,
}

impl AppleScriptSpotify {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl SpotifyAppRemote for AppleScriptSpotify {
    fn is_installed(&self) -> bool {
        is_app_installed(APP)
    }

    fn connect(
        &self,
        params: &ConnectionParams,
        on_lost: ConnectionLost,
    ) -> Result<Arc<dyn SpotifyRemote>, SpotifyNativeError> {
        if !self.is_installed() {
            return Err(SpotifyNativeError::CouldNotFindSpotifyApp);
        }
        tracing::debug!(client_id = %params.client_id, "launching Spotify desktop app");
        tell(APP, "launch").map_err(script_error)?;
        Ok(ScriptRemote::start(self.poll_interval, on_lost))
    }
}

struct ScriptRemote {
    connected: Arc<AtomicBool>,
    poll_interval: Duration,
    watchdog: Mutex<Option<Poller>>,
}

impl ScriptRemote {
    fn start(poll_interval: Duration, on_lost: ConnectionLost) -> Arc<Self> {
        let connected = Arc::new(AtomicBool::new(true));
        let alive = connected.clone();
        let watchdog = Poller::spawn("spotify-watchdog", poll_interval, move || {
            if alive.load(Ordering::SeqCst) && !is_app_running(APP) {
                alive.store(false, Ordering::SeqCst);
                on_lost(SpotifyNativeError::ConnectionTerminated);
            }
        });
        Arc::new(Self {
            connected,
            poll_interval,
            watchdog: Mutex::new(watchdog),
        })
    }

    fn command(&self, command: &str) -> Result<(), SpotifyNativeError> {
        tell(APP, command).map(drop).map_err(script_error)
    }
}

impl SpotifyRemote for ScriptRemote {
    fn player_state(&self) -> Result<SpotifyPlayerState, SpotifyNativeError> {
        let output = run_script(STATE_SCRIPT).map_err(script_error)?;
        parse_player_state(&output)
    }

    fn subscribe_to_player_state(&self, callback: PlayerStateCallback) -> NativeSubscription {
        let mut last: Option<SpotifyPlayerState> = None;
        let poller = Poller::spawn("spotify-state", self.poll_interval, move || {
            let Ok(output) = run_script(STATE_SCRIPT) else {
                return;
            };
            let Ok(state) = parse_player_state(&output) else {
                return;
            };
            if last.as_ref() != Some(&state) {
                last = Some(state.clone());
                callback(state);
            }
        });
        NativeSubscription::new(move || drop(poller))
    }

    fn play(&self, uri: &str) -> Result<(), SpotifyNativeError> {
        self.command(&format!("play track {}", quote(uri)))
    }

    fn resume(&self) -> Result<(), SpotifyNativeError> {
        self.command("play")
    }

    fn pause(&self) -> Result<(), SpotifyNativeError> {
        self.command("pause")
    }

    fn skip_next(&self) -> Result<(), SpotifyNativeError> {
        self.command("next track")
    }

    fn skip_previous(&self) -> Result<(), SpotifyNativeError> {
        self.command("previous track")
    }

    fn set_shuffle(&self, enabled: bool) -> Result<(), SpotifyNativeError> {
        self.command(&format!("set shuffling to {enabled}"))
    }

    fn set_repeat(&self, mode: SpotifyRepeat) -> Result<(), SpotifyNativeError> {
        // The desktop app only knows on/off; single-track repeat maps to on.
        let enabled = mode != SpotifyRepeat::Off;
        self.command(&format!("set repeating to {enabled}"))
    }

    fn seek_to(&self, position_ms: u64) -> Result<(), SpotifyNativeError> {
        let seconds = position_ms as f64 / 1000.0;
        self.command(&format!("set player position to {seconds}"))
    }

    fn image(&self, uri: &str, _dimension: ImageDimension) -> Result<Vec<u8>, SpotifyNativeError> {
        // The desktop app reports plain https artwork URLs.
        if !uri.starts_with("http") {
            return Err(SpotifyNativeError::Unsupported);
        }
        let fetch = || -> reqwest::Result<Vec<u8>> {
            Ok(reqwest::blocking::get(uri)?.error_for_status()?.bytes()?.to_vec())
        };
        fetch().map_err(|error| SpotifyNativeError::Other(error.to_string()))
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        lock(&self.watchdog).take();
    }
}

fn parse_player_state(output: &str) -> Result<SpotifyPlayerState, SpotifyNativeError> {
    let parts: Vec<&str> = output.split(SEPARATOR).collect();
    if parts.len() < 3 {
        return Err(SpotifyNativeError::Other(format!(
            "unexpected player state output: {output}"
        )));
    }

    let options = SpotifyPlayerOptions {
        is_shuffling: parts[1] == "true",
        repeat_mode: if parts[2] == "true" {
            SpotifyRepeat::Context
        } else {
            SpotifyRepeat::Off
        },
    };

    if parts[0] == "STOPPED" || parts.len() < 10 {
        return Ok(SpotifyPlayerState {
            track: None,
            is_paused: true,
            playback_speed: 0.0,
            playback_position: 0,
            playback_options: Some(options),
        });
    }

    let is_paused = parts[0] != "playing";
    let artist = SpotifyArtist {
        name: parts[4].to_string(),
        uri: String::new(),
    };
    let track = SpotifyTrack {
        name: parts[3].to_string(),
        uri: parts[9].to_string(),
        artists: vec![artist.clone()],
        artist,
        album: SpotifyAlbum {
            name: parts[5].to_string(),
            uri: String::new(),
        },
        duration: parse_real(parts[6]) as u64,
        image_uri: Some(parts[8].to_string())
            .filter(|url| !url.is_empty() && url != "missing value"),
        is_episode: parts[9].starts_with("spotify:episode:"),
        is_podcast: false,
    };

    Ok(SpotifyPlayerState {
        track: Some(track),
        is_paused,
        playback_speed: if is_paused { 0.0 } else { 1.0 },
        playback_position: (parse_real(parts[7]) * 1000.0) as u64,
        playback_options: Some(options),
    })
}

//! Everything the binary prints. One line per event, optionally JSON.

use serde_json::json;

use crate::player::remote::{Connected, RemoteState};
use crate::player::{ConnectionState, ServiceStatus};

fn format_time(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn describe(state: &RemoteState) -> String {
    match state {
        RemoteState::Disconnected => "disconnected".to_string(),
        RemoteState::Connecting { service } => format!("connecting to {service}"),
        RemoteState::Connected(Connected::NoPlayback { service }) => {
            format!("{service}: nothing playing")
        }
        RemoteState::Connected(Connected::Playback {
            service,
            track,
            is_paused,
            position_ms,
        }) => format!(
            "{service}: {} {} - {} [{}/{}]",
            if *is_paused { "paused" } else { "playing" },
            track.title,
            track.artist_line(),
            format_time(*position_ms),
            format_time(track.duration_ms),
        ),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    pub fn remote(&self, state: &RemoteState) {
        if self.json {
            match serde_json::to_string(state) {
                Ok(line) => println!("{line}"),
                Err(error) => tracing::warn!(%error, "could not serialize remote state"),
            }
        } else {
            println!("{}", describe(state));
        }
    }

    pub fn connection_error(&self, state: &ConnectionState) {
        let ConnectionState::Error(service, error) = state else {
            return;
        };
        if self.json {
            println!("{}", json!({ "event": "error", "service": service, "error": error }));
        } else {
            println!("{service}: {error}");
        }
    }

    pub fn services(&self, services: &[ServiceStatus]) {
        if self.json {
            println!("{}", json!({ "event": "services", "services": services }));
            return;
        }
        for status in services {
            let installed = if status.is_installed { "installed" } else { "not installed" };
            println!("{}: {installed}", status.service);
        }
    }

    pub fn message(&self, kind: &str, text: &str) {
        if self.json {
            println!("{}", json!({ "event": kind, "message": text }));
        } else {
            println!("{text}");
        }
    }
}

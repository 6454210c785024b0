use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

/// Field separator of the scripts' single-line output.
pub const SEPARATOR: &str = "|||";

/// Run a raw AppleScript command
pub fn run_script(script: &str) -> Result<String> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .context("Failed to execute AppleScript")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("AppleScript error: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// AppleScript string literal holding `value`.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Send one command to an application.
pub fn tell(app: &str, command: &str) -> Result<String> {
    run_script(&format!("tell application {} to {command}", quote(app)))
}

/// Check if a macOS application is running via pgrep
pub fn is_app_running(app_name: &str) -> bool {
    Command::new("pgrep")
        .arg("-x")
        .arg(app_name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Whether LaunchServices knows the application, running or not.
pub fn is_app_installed(app_name: &str) -> bool {
    run_script(&format!("id of application {}", quote(app_name))).is_ok()
}

/// AppleScript prints reals with the locale's decimal separator.
pub fn parse_real(value: &str) -> f64 {
    value.trim().replace(',', ".").parse().unwrap_or(0.0)
}

/// Runs `tick` on a background thread every `interval` until dropped.
pub struct Poller {
    stop: Arc<AtomicBool>,
}

impl Poller {
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> Option<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = stop.clone();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while !stopped.load(Ordering::Relaxed) {
                    tick();
                    thread::sleep(interval);
                }
            });
        match spawned {
            Ok(_) => Some(Self { stop }),
            Err(error) => {
                tracing::warn!(%error, name, "could not start poller");
                None
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

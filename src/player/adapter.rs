use serde::Serialize;
use tokio::task::JoinHandle;

use super::PlayerService;

/// Coarse lifecycle position of an adapter, used to decide whether it needs
/// tearing down or (re)connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterPhase {
    Idle,
    Connecting,
    Live,
    Failed,
}

/// Native releases still running in the background after a disconnect.
#[derive(Debug, Default)]
pub struct Teardown {
    releases: Vec<JoinHandle<()>>,
}

impl Teardown {
    pub(crate) fn of(release: Option<JoinHandle<()>>) -> Self {
        Self {
            releases: release.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn merge(mut self, other: Teardown) -> Self {
        self.releases.extend(other.releases);
        self
    }

    /// Wait for every release to finish. A panicking release counts as finished.
    pub async fn finished(self) {
        for release in self.releases {
            if let Err(error) = release.await {
                tracing::warn!(%error, "native release failed");
            }
        }
    }
}

/// Uniform control surface of a vendor adapter. Connection outcomes are
/// observed through each adapter's own state signal, never returned here.
pub trait PlatformAdapter: Send + Sync {
    fn service(&self) -> PlayerService;
    fn phase(&self) -> AdapterPhase;
    fn is_installed(&self) -> bool;
    /// Start connecting once `after` has finished. Non-blocking; no-op while
    /// connected or connecting.
    fn connect_after(&self, after: Teardown);
    /// Drop the session. Idempotent.
    fn disconnect(&self) -> Teardown;
    /// Silence playback, then drop the session.
    fn hand_off(&self) -> Teardown;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub service: PlayerService,
    pub is_installed: bool,
}

impl ServiceStatus {
    pub fn of(adapter: &dyn PlatformAdapter) -> Self {
        Self {
            service: adapter.service(),
            is_installed: adapter.is_installed(),
        }
    }
}

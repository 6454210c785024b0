use thiserror::Error;

use super::PlayerService;

/// Why a connection attempt ended. Closed set; vendor codes map onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize)]
pub enum ConnectError {
    #[error("the connection was cancelled by the user")]
    UserCancelled,
    #[error("the account has no active subscription")]
    NoSubscription,
    #[error("the music app is not installed")]
    NotInstalled,
    #[error("the app credentials were rejected")]
    AuthError,
    #[error("unknown error")]
    Unknown,
}

/// Failure of a command issued through a [`crate::player::Player`].
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("{0} player is no longer connected")]
    Inactive(PlayerService),
    #[error("{service} rejected the command: {message}")]
    Rejected {
        service: PlayerService,
        message: String,
    },
    #[error("{0} does not support this command")]
    Unsupported(PlayerService),
    #[error("player task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

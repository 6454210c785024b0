use std::sync::Arc;

use crate::player::applemusic::{Authorization, MusicKit, MusicPlayerController, TokenError};
use crate::player::auth::{DeveloperToken, MusicUserToken};
use crate::player::spotify::remote::{ConnectionLost, SpotifyNativeError};
use crate::player::spotify::{ConnectionParams, SpotifyAppRemote, SpotifyRemote};

/// Stand-in SDK for platforms without a bridge. Nothing is ever installed.
pub struct UnsupportedPlatform;

impl SpotifyAppRemote for UnsupportedPlatform {
    fn is_installed(&self) -> bool {
        false
    }

    fn connect(
        &self,
        _params: &ConnectionParams,
        _on_lost: ConnectionLost,
    ) -> Result<Arc<dyn SpotifyRemote>, SpotifyNativeError> {
        Err(SpotifyNativeError::CouldNotFindSpotifyApp)
    }
}

impl MusicKit for UnsupportedPlatform {
    fn is_installed(&self) -> bool {
        false
    }

    fn authorize(&self, _developer_token: &DeveloperToken) -> Authorization {
        Authorization::Denied(TokenError::Unknown)
    }

    fn create_controller(
        &self,
        _developer_token: &DeveloperToken,
        _user_token: &MusicUserToken,
    ) -> Result<Arc<dyn MusicPlayerController>, TokenError> {
        Err(TokenError::Unknown)
    }
}

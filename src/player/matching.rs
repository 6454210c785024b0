//! Playing a song on whichever service is connected, identified by ISRC.

use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::auth::AuthProvider;
use super::{Player, PlayerError};

const APPLE_MUSIC_CATALOG: &str = "https://api.music.apple.com/v1/catalog";
const SPOTIFY_SEARCH: &str = "https://api.spotify.com/v1/search";

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Player(#[from] PlayerError),
}

#[derive(Debug, Deserialize)]
struct AppleMusicSongs {
    data: Vec<AppleMusicSong>,
}

#[derive(Debug, Deserialize)]
struct AppleMusicSong {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpotifySearch {
    tracks: SpotifyTracks,
}

#[derive(Debug, Deserialize)]
struct SpotifyTracks {
    items: Vec<SpotifySearchTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifySearchTrack {
    uri: String,
}

pub struct IsrcMatcher {
    client: Client,
    auth: Arc<dyn AuthProvider>,
    storefront: String,
}

impl IsrcMatcher {
    pub fn new(client: Client, auth: Arc<dyn AuthProvider>, storefront: impl Into<String>) -> Self {
        Self {
            client,
            auth,
            storefront: storefront.into(),
        }
    }

    /// Look the ISRC up in the player's catalog and start it. `Ok(false)`
    /// when credentials are missing or the catalog has no match.
    pub async fn play_isrc(&self, player: &Player, isrc: &str) -> Result<bool, MatchError> {
        info!(isrc, service = %player.service(), "playing from ISRC");
        match player {
            Player::AppleMusic(apple_music) => {
                let Some(song_id) = self.apple_music_song(isrc).await? else {
                    return Ok(false);
                };
                apple_music.set_queue(vec![song_id], true).await?;
            }
            Player::Spotify(spotify) => {
                let Some(uri) = self.spotify_track(isrc).await? else {
                    return Ok(false);
                };
                spotify.play_uri(&uri).await?;
            }
        }
        Ok(true)
    }

    async fn apple_music_song(&self, isrc: &str) -> Result<Option<String>, MatchError> {
        let Some(token) = self.auth.apple_music_developer_token() else {
            info!("no Apple Music developer token, cannot match");
            return Ok(None);
        };
        let url = format!("{APPLE_MUSIC_CATALOG}/{}/songs", self.storefront);
        let songs: AppleMusicSongs = self
            .client
            .get(url)
            .bearer_auth(&token.0)
            .query(&[("filter[isrc]", isrc)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let id = first_song(songs);
        if id.is_none() {
            info!(isrc, "no Apple Music song for ISRC");
        }
        Ok(id)
    }

    async fn spotify_track(&self, isrc: &str) -> Result<Option<String>, MatchError> {
        let Some(token) = self
            .auth
            .spotify_access_token()
            .filter(|token| !token.is_expired())
        else {
            info!("no usable Spotify access token, cannot match");
            return Ok(None);
        };
        let query = format!("isrc:{isrc}");
        let search: SpotifySearch = self
            .client
            .get(SPOTIFY_SEARCH)
            .bearer_auth(&token.token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let uri = first_track(search);
        if uri.is_none() {
            info!(isrc, "no Spotify track for ISRC");
        }
        Ok(uri)
    }
}

fn first_song(songs: AppleMusicSongs) -> Option<String> {
    songs.data.into_iter().next().map(|song| song.id)
}

fn first_track(search: SpotifySearch) -> Option<String> {
    search.tracks.items.into_iter().next().map(|track| track.uri)
}

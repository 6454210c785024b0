//! Track artwork, resolved lazily and keyed by track identity.

use std::sync::Arc;

use image::DynamicImage;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::spotify::ImageDimension;
use super::{Artwork, Player, PlayerError, Track, TrackId};

const ITUNES_SEARCH: &str = "https://itunes.apple.com/search";
const ITUNES_COUNTRIES: [&str; 2] = ["US", "IN"];
const ARTWORK_SIZE: &str = "600";

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("artwork request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("artwork could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error("vendor artwork needs a connected Spotify player")]
    NoPlayer,
    #[error("no artwork found for {0}")]
    NotFound(TrackId),
}

#[derive(Debug, Deserialize)]
struct ItunesResponse {
    results: Vec<ItunesAlbum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesAlbum {
    artwork_url100: String,
    collection_name: Option<String>,
    artist_name: Option<String>,
}

/// Resolves a [`Track`]'s artwork to a decoded image.
pub struct TrackImageResolver {
    client: Client,
    cache: Cache<TrackId, Arc<DynamicImage>>,
}

impl TrackImageResolver {
    pub fn new(client: Client, capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity.max(1)).build();
        Self { client, cache }
    }

    /// `player` is needed for Spotify image URIs, which only the connected
    /// App Remote can fetch. Concurrent calls for the same track share one
    /// download.
    pub async fn resolve(
        &self,
        track: &Track,
        player: Option<&Player>,
    ) -> Result<Arc<DynamicImage>, Arc<ArtworkError>> {
        self.cache
            .try_get_with(track.id.clone(), self.load(track, player))
            .await
    }

    async fn load(
        &self,
        track: &Track,
        player: Option<&Player>,
    ) -> Result<Arc<DynamicImage>, ArtworkError> {
        let bytes = match &track.artwork {
            Artwork::Url(template) => self.fetch(&sized(template)).await?,
            Artwork::ImageUri(uri) => match player {
                Some(Player::Spotify(spotify)) => {
                    spotify.image(uri, ImageDimension::Large).await?
                }
                _ => return Err(ArtworkError::NoPlayer),
            },
            Artwork::None => {
                let url = self
                    .itunes_artwork(&track.artist_line(), &track.album)
                    .await?
                    .ok_or_else(|| ArtworkError::NotFound(track.id.clone()))?;
                self.fetch(&url).await?
            }
        };
        debug!(track = %track.id, "artwork loaded");
        Ok(Arc::new(image::load_from_memory(&bytes)?))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ArtworkError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Album artwork URL from the iTunes search API, trying each storefront
    /// until one has an album by a matching artist.
    async fn itunes_artwork(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<String>, ArtworkError> {
        let artist = normalize(artist);
        let album = normalize(album);
        let term = format!("{artist} {album}");

        for country in ITUNES_COUNTRIES {
            let response: ItunesResponse = self
                .client
                .get(ITUNES_SEARCH)
                .query(&[
                    ("term", term.as_str()),
                    ("entity", "album"),
                    ("limit", "5"),
                    ("country", country),
                ])
                .send()
                .await?
                .json()
                .await?;

            if let Some(found) = best_album(&response.results, &artist, &album) {
                debug!(country, "artwork found on iTunes");
                let size = format!("{ARTWORK_SIZE}x{ARTWORK_SIZE}bb");
                return Ok(Some(found.artwork_url100.replace("100x100bb", &size)));
            }
        }
        Ok(None)
    }
}

/// Fill the `{w}`/`{h}` placeholders of MusicKit artwork URLs.
fn sized(template: &str) -> String {
    template
        .replace("{w}", ARTWORK_SIZE)
        .replace("{h}", ARTWORK_SIZE)
}

/// Lowercase and strip "(...)", "[...]" and "feat." suffixes.
fn normalize(value: &str) -> String {
    let lower = value.to_lowercase();
    let end = ["(", "[", "feat"]
        .iter()
        .filter_map(|marker| lower.find(marker))
        .min()
        .unwrap_or(lower.len());
    lower[..end].trim().to_string()
}

fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn best_album<'a>(
    results: &'a [ItunesAlbum],
    artist: &str,
    album: &str,
) -> Option<&'a ItunesAlbum> {
    let by_artist: Vec<&ItunesAlbum> = results
        .iter()
        .filter(|result| {
            result
                .artist_name
                .as_deref()
                .map_or(true, |name| overlaps(&normalize(name), artist))
        })
        .collect();

    by_artist
        .iter()
        .find(|result| {
            result
                .collection_name
                .as_deref()
                .is_some_and(|name| overlaps(&normalize(name), album))
        })
        .or(by_artist.first())
        .copied()
}

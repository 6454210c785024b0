use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::player::auth::{AuthProvider, DeveloperToken, SpotifyAccessToken};
use crate::player::spotify::ConnectionParams;
use crate::player::PlayerService;

/// User-editable configuration
/// stored in `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service to connect to on startup; none waits for a command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_service: Option<PlayerService>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub apple_music: AppleMusicConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default)]
    pub show_auth_view: bool,
    /// Web API token for ISRC lookups; refreshing it is up to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppleMusicConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_token: Option<String>,
    #[serde(default = "default_storefront")]
    pub storefront: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_client_id() -> String {
    "motif".to_string()
}

fn default_redirect_uri() -> String {
    "motif://spotify-callback".to_string()
}

fn default_storefront() -> String {
    "us".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_service: None,
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval(),
            spotify: SpotifyConfig::default(),
            apple_music: AppleMusicConfig::default(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            show_auth_view: false,
            access_token: None,
            access_token_expires_at: None,
        }
    }
}

impl Default for AppleMusicConfig {
    fn default() -> Self {
        Self {
            developer_token: None,
            storefront: default_storefront(),
        }
    }
}

impl AppConfig {
    pub fn get_config_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("motif")
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    /// Load `path`, writing the defaults there first when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            fs::write(path, config.to_toml()?)
                .with_context(|| format!("Failed to write default config to {}", path.display()))?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// The file contents `--generate-config` prints.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            client_id: self.spotify.client_id.clone(),
            redirect_uri: self.spotify.redirect_uri.clone(),
            show_auth_view: self.spotify.show_auth_view,
        }
    }
}

impl AuthProvider for AppConfig {
    fn apple_music_developer_token(&self) -> Option<DeveloperToken> {
        self.apple_music
            .developer_token
            .clone()
            .filter(|token| !token.is_empty())
            .map(DeveloperToken)
    }

    fn spotify_access_token(&self) -> Option<SpotifyAccessToken> {
        let token = SpotifyAccessToken {
            token: self.spotify.access_token.clone().filter(|t| !t.is_empty())?,
            expires_at: self.spotify.access_token_expires_at,
        };
        if token.is_expired() {
            tracing::warn!("configured Spotify access token has expired");
            return None;
        }
        Some(token)
    }
}

//! Credentials the adapters and the matcher ask for.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Apple Music developer token (a signed JWT).
#[derive(Clone, PartialEq, Eq)]
pub struct DeveloperToken(pub String);

/// Apple Music user token obtained through MusicKit authorization.
#[derive(Clone, PartialEq, Eq)]
pub struct MusicUserToken(pub String);

// Tokens stay out of logs.
impl fmt::Debug for DeveloperToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeveloperToken(..)")
    }
}

impl fmt::Debug for MusicUserToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MusicUserToken(..)")
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SpotifyAccessToken {
    pub token: String,
    /// Unix seconds; `None` when unknown.
    pub expires_at: Option<u64>,
}

impl SpotifyAccessToken {
    pub fn is_expired(&self) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_secs())
            .unwrap_or(0);
        now >= expires_at
    }
}

impl fmt::Debug for SpotifyAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyAccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Source of vendor credentials. Refreshing them is the provider's business.
pub trait AuthProvider: Send + Sync {
    fn apple_music_developer_token(&self) -> Option<DeveloperToken>;

    /// A usable token; expired ones are reported as absent.
    fn spotify_access_token(&self) -> Option<SpotifyAccessToken>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_tokens() {
        let token = SpotifyAccessToken {
            token: "secret".to_string(),
            expires_at: Some(1),
        };
        assert!(!format!("{token:?}").contains("secret"));
        assert!(!format!("{:?}", DeveloperToken("secret".to_string())).contains("secret"));
    }

    #[test]
    fn test_expiry() {
        let expired = SpotifyAccessToken {
            token: "t".to_string(),
            expires_at: Some(1),
        };
        assert!(expired.is_expired());

        let open_ended = SpotifyAccessToken {
            token: "t".to_string(),
            expires_at: None,
        };
        assert!(!open_ended.is_expired());
    }
}

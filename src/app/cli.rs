use std::path::PathBuf;

use clap::Parser;

use crate::player::PlayerService;

/// Motif - one player over Spotify and Apple Music, driven from stdin
#[derive(Parser, Debug)]
#[command(name = "motif", version, about)]
pub struct Args {
    /// Service to connect to on startup (overrides `default_service`)
    #[arg(long, short = 's', value_enum)]
    pub service: Option<PlayerService>,

    /// Path of config.toml (default: ~/.config/motif/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Generate default config.toml to stdout
    #[arg(long)]
    pub generate_config: bool,

    /// Print state changes as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Log level (overrides `log_level`)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["motif", "--service", "apple-music", "--json"]);
        assert_eq!(args.service, Some(PlayerService::AppleMusic));
        assert!(args.json);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_log_level_flag() {
        let args = Args::parse_from(["motif", "--log-level", "debug"]);
        assert_eq!(args.log_level, Some(tracing::Level::DEBUG));
    }
}

//! The `motif` binary: wires config, platform bridges and the negotiation
//! together and drives them from stdin.

pub mod cli;
pub mod commands;
pub mod events;
pub mod logging;
pub mod output;

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::player::applemusic::AppleMusicAuthentication;
use crate::player::artwork::TrackImageResolver;
use crate::player::auth::{AuthProvider, MusicUserToken};
use crate::player::matching::IsrcMatcher;
use crate::player::remote::RemoteStateTracker;
use crate::player::spotify::SpotifyConnector;
use crate::player::{platform, ConnectionState, PlayerNegotiation};
use cli::Args;
use commands::{Command, HELP};
use events::AppEvent;
use output::Output;

const ARTWORK_CACHE: u64 = 32;

struct Services {
    negotiation: PlayerNegotiation,
    tracker: RemoteStateTracker,
    matcher: IsrcMatcher,
    resolver: TrackImageResolver,
}

pub async fn run() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        print!("{}", AppConfig::default().to_toml()?);
        return Ok(());
    }

    let path = args.config.clone().unwrap_or_else(AppConfig::get_config_path);
    let config = AppConfig::load_from(&path)?;
    let level = args
        .log_level
        .unwrap_or_else(|| logging::parse_level(&config.log_level));
    let log_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::get_config_dir);
    let _guard = logging::init(&log_dir, level);
    info!(config = %path.display(), "starting motif");

    let config = Arc::new(config);
    let auth: Arc<dyn AuthProvider> = config.clone();
    let backends = platform::backends(config.poll_interval());

    let spotify = SpotifyConnector::new(backends.spotify, config.connection_params());
    let apple_music = AppleMusicAuthentication::new(backends.music_kit, auth.clone());
    let mut intents = apple_music.intents();
    let negotiation = PlayerNegotiation::new(spotify, apple_music);

    let client = reqwest::Client::builder()
        .user_agent(concat!("motif-rs/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let services = Services {
        tracker: RemoteStateTracker::new(negotiation.state()),
        matcher: IsrcMatcher::new(client.clone(), auth, config.apple_music.storefront.clone()),
        resolver: TrackImageResolver::new(client, ARTWORK_CACHE),
        negotiation,
    };

    let (tx, mut rx) = mpsc::channel(100);

    // 1. Stdin, on a plain thread so a pending read never holds up shutdown
    let tx_input = tx.clone();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if tx_input.blocking_send(AppEvent::Input(line.parse())).is_err() {
                    return;
                }
            }
            let _ = tx_input.blocking_send(AppEvent::InputClosed);
        })
        .context("Failed to spawn stdin reader")?;

    // 2. Remote state feed
    let tx_remote = tx.clone();
    let mut remote = services.tracker.observe();
    tokio::spawn(async move {
        loop {
            if tx_remote.send(AppEvent::Remote(remote.latest())).await.is_err() {
                break;
            }
            remote.changed().await;
        }
    });

    // 3. Connection errors, which the remote state renders as plain disconnected
    let tx_connection = tx.clone();
    let mut connection = services.negotiation.state();
    tokio::spawn(async move {
        loop {
            let state = connection.latest();
            if matches!(state, ConnectionState::Error(..))
                && tx_connection.send(AppEvent::Connection(state)).await.is_err()
            {
                break;
            }
            connection.changed().await;
        }
    });

    // 4. Apple Music authorization requests
    let tx_intent = tx.clone();
    tokio::spawn(async move {
        loop {
            match intents.recv().await {
                Ok(intent) => {
                    if tx_intent.send(AppEvent::Intent(intent)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "missed authorization requests");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    drop(tx);

    if let Some(service) = args.service.or(config.default_service) {
        services.negotiation.set_service(service);
    }

    let out = Output { json: args.json };
    while let Some(event) = rx.recv().await {
        match event {
            AppEvent::Input(Ok(Command::Quit)) | AppEvent::InputClosed => break,
            AppEvent::Input(Ok(command)) => {
                if let Err(error) = execute(&services, command, out).await {
                    out.message("error", &format!("{error:#}"));
                }
            }
            AppEvent::Input(Err(error)) => out.message("error", &error.to_string()),
            AppEvent::Remote(state) => out.remote(&state),
            AppEvent::Connection(state) => out.connection_error(&state),
            AppEvent::Intent(intent) => out.message(
                "authorize",
                &format!(
                    "Apple Music needs authorization: {} (then `authorized <token>`)",
                    intent.url
                ),
            ),
        }
    }

    info!("shutting down");
    services.negotiation.disconnect();
    Ok(())
}

async fn execute(services: &Services, command: Command, out: Output) -> Result<()> {
    let negotiation = &services.negotiation;
    let player = || negotiation.player_or_none().context("No player connected");

    match command {
        Command::Connect(service) => negotiation.set_service(service),
        Command::Disconnect => negotiation.disconnect(),
        Command::Play => player()?.resume().await?,
        Command::Pause => player()?.pause().await?,
        Command::Stop => player()?.stop().await?,
        Command::Next => player()?.skip_next().await?,
        Command::Prev => player()?.skip_previous().await?,
        Command::Seek(position_ms) => player()?.seek_to(position_ms).await?,
        Command::Repeat(mode) => player()?.set_repeat_mode(mode).await?,
        Command::Shuffle(mode) => player()?.set_shuffle_mode(mode).await?,
        Command::Isrc(isrc) => {
            let player = player()?;
            if services.matcher.play_isrc(&player, &isrc).await? {
                out.message("isrc", &format!("playing {isrc} on {}", player.service()));
            } else {
                out.message("isrc", &format!("{isrc} not found on {}", player.service()));
            }
        }
        Command::Artwork => {
            let player = player()?;
            let track = player
                .current_state()
                .await?
                .track
                .context("Nothing is playing")?;
            let image = services.resolver.resolve(&track, Some(&player)).await?;
            out.message(
                "artwork",
                &format!("{}: {}x{}", track.title, image.width(), image.height()),
            );
        }
        Command::Authorized(token) => negotiation
            .apple_music()
            .handle_authorization(Ok(MusicUserToken(token))),
        Command::Status => {
            out.remote(&services.tracker.current());
            out.connection_error(&negotiation.current());
        }
        Command::Services => out.services(&negotiation.available_services()),
        Command::Help => out.message("help", HELP),
        Command::Quit => {}
    }
    Ok(())
}

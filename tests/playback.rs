mod common;

use motif::player::remote::{Connected, RemoteState, RemoteStateTracker};
use motif::player::{
    ConnectionState, PlaybackStatus, Player, PlayerService, RepeatMode, ShuffleMode,
};

use common::{media_item, spotify_state, spotify_track, wait_until, within, Harness};

async fn connect(harness: &Harness, service: PlayerService) -> Player {
    let mut state = harness.negotiation.state();
    harness.negotiation.set_service(service);
    let connected = within(
        state.wait_for(|state| matches!(state, ConnectionState::Connected(s, _) if *s == service)),
    )
    .await;
    connected.player().cloned().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spotify_updates_conflate_and_detach() {
    let harness = Harness::new();
    let player = connect(&harness, PlayerService::Spotify).await;
    let remote = harness.spotify.remote();
    assert_eq!(remote.subscriptions(), 0);

    let mut updates = player.observe_state().unwrap();
    assert_eq!(remote.subscriptions(), 1);
    let first = within(updates.next()).await.unwrap();
    assert_eq!(first.track, None);
    assert_eq!(first.status, PlaybackStatus::Paused);

    remote.emit(spotify_state(Some(spotify_track("One")), false, 1_000));
    remote.emit(spotify_state(Some(spotify_track("Two")), false, 2_000));
    let latest = within(updates.next()).await.unwrap();
    assert_eq!(latest.track.unwrap().title, "Two");
    assert_eq!(latest.status, PlaybackStatus::Playing);
    assert_eq!(latest.position_ms, 2_000);

    drop(updates);
    assert_eq!(remote.subscriptions(), 0);
    assert_eq!(harness.log.count("spotify.unsubscribe"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_updates_end_with_the_session() {
    let harness = Harness::new();
    let player = connect(&harness, PlayerService::Spotify).await;
    let mut updates = player.observe_state().unwrap();
    within(updates.next()).await.unwrap();

    harness.negotiation.disconnect();

    assert_eq!(within(updates.next()).await, None);
    assert!(player.observe_state().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_apple_music_listener_lifecycle() {
    let harness = Harness::new();
    let player = connect(&harness, PlayerService::AppleMusic).await;
    let controller = harness.music_kit.controller();
    assert_eq!(controller.listeners(), 0);

    let mut updates = player.observe_state().unwrap();
    assert_eq!(controller.listeners(), 1);
    let initial = within(updates.next()).await.unwrap();
    assert_eq!(initial.status, PlaybackStatus::Stopped);
    assert_eq!(initial.track, None);

    controller.emit(1, Some(media_item("Song")));
    let playing = within(updates.next()).await.unwrap();
    assert_eq!(playing.status, PlaybackStatus::Playing);
    let track = playing.track.unwrap();
    assert_eq!(track.title, "Song");
    assert_eq!(track.id.0, "id-Song");

    drop(updates);
    assert_eq!(controller.listeners(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_commands_reach_the_connected_service() {
    let harness = Harness::new();

    let spotify = connect(&harness, PlayerService::Spotify).await;
    spotify.set_repeat_mode(RepeatMode::One).await.unwrap();
    spotify.set_shuffle_mode(ShuffleMode::On).await.unwrap();
    spotify.seek_to(42_000).await.unwrap();
    // Spotify has no stop; it is accepted and does nothing.
    spotify.stop().await.unwrap();
    for entry in ["spotify.repeat Track", "spotify.shuffle true", "spotify.seek 42000"] {
        assert_eq!(harness.log.count(entry), 1, "{entry}");
    }

    let apple_music = connect(&harness, PlayerService::AppleMusic).await;
    apple_music.set_repeat_mode(RepeatMode::All).await.unwrap();
    apple_music.set_shuffle_mode(ShuffleMode::On).await.unwrap();
    apple_music.skip_previous().await.unwrap();
    let Player::AppleMusic(apple_music) = apple_music else {
        panic!("expected an Apple Music player");
    };
    apple_music
        .set_queue(vec!["a".to_string(), "b".to_string()], true)
        .await
        .unwrap();
    for entry in ["apple.repeat 2", "apple.shuffle 1", "apple.previous", "apple.queue a,b"] {
        assert_eq!(harness.log.count(entry), 1, "{entry}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_state_follows_the_current_player() {
    let harness = Harness::new();
    let tracker = RemoteStateTracker::new(harness.negotiation.state());
    let mut remote_state = tracker.observe();
    assert_eq!(tracker.current(), RemoteState::Disconnected);

    connect(&harness, PlayerService::Spotify).await;
    let remote = harness.spotify.remote();
    wait_until(|| remote.subscriptions() == 1).await;

    remote.emit(spotify_state(Some(spotify_track("One")), false, 1_000));
    let playing = within(remote_state.wait_for(|state| {
        matches!(state, RemoteState::Connected(Connected::Playback { .. }))
    }))
    .await;
    let RemoteState::Connected(Connected::Playback {
        service,
        track,
        is_paused,
        position_ms,
    }) = playing
    else {
        unreachable!()
    };
    assert_eq!(service, PlayerService::Spotify);
    assert_eq!(track.title, "One");
    assert!(!is_paused);
    assert_eq!(position_ms, 1_000);

    // Switching moves the tracker to the new player's updates.
    connect(&harness, PlayerService::AppleMusic).await;
    let controller = harness.music_kit.controller();
    wait_until(|| controller.listeners() == 1).await;
    assert_eq!(remote.subscriptions(), 0);

    controller.emit(2, Some(media_item("Song")));
    within(remote_state.wait_for(|state| {
        matches!(
            state,
            RemoteState::Connected(Connected::Playback {
                service: PlayerService::AppleMusic,
                is_paused: true,
                ..
            })
        )
    }))
    .await;

    harness.negotiation.disconnect();
    within(remote_state.wait_for(|state| *state == RemoteState::Disconnected)).await;
    wait_until(|| controller.listeners() == 0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_apple_music_listener_removed_before_release() {
    let harness = Harness::new();
    let player = connect(&harness, PlayerService::AppleMusic).await;
    let controller = harness.music_kit.controller();
    let mut updates = player.observe_state().unwrap();
    within(updates.next()).await.unwrap();
    assert_eq!(controller.listeners(), 1);

    // The observer outlives the switch, as the remote state tracker's does.
    connect(&harness, PlayerService::Spotify).await;
    harness.log.wait_for("apple.release").await;
    assert_eq!(controller.listeners(), 0);

    let removed = harness.log.position("apple.remove_listener").unwrap();
    let released = harness.log.position("apple.release").unwrap();
    assert!(removed < released, "{:?}", harness.log.entries());

    // A callback already in flight must not read the released controller.
    let reads = harness.log.count("apple.read");
    controller.emit_late(1);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(harness.log.count("apple.read"), reads);

    drop(updates);
    assert_eq!(harness.log.count("apple.remove_listener"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spotify_subscription_cancelled_before_disconnect() {
    let harness = Harness::new();
    let player = connect(&harness, PlayerService::Spotify).await;
    let remote = harness.spotify.remote();
    let updates = player.observe_state().unwrap();
    assert_eq!(remote.subscriptions(), 1);

    harness.negotiation.disconnect();
    harness.log.wait_for("spotify.disconnect").await;
    assert_eq!(remote.subscriptions(), 0);

    let cancelled = harness.log.position("spotify.unsubscribe").unwrap();
    let disconnected = harness.log.position("spotify.disconnect").unwrap();
    assert!(cancelled < disconnected, "{:?}", harness.log.entries());

    drop(updates);
    assert_eq!(harness.log.count("spotify.unsubscribe"), 1);
}

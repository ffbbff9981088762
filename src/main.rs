//! Trackline client entrypoint: follows one game session and logs its status.

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{sync::broadcast::error::RecvError, time::sleep};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackline_client::{
    api::{spotify::SpotifyClient, trackline::TracklineClient},
    config::ClientConfig,
    services::{game_service, operation::Settled, resync},
    state::{AppState, ServerClock, SharedState, StatusEvent},
};

const INITIAL_DELAY: Duration = Duration::from_secs(2);
const MAX_DELAY: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::load();
    let game_id = env::args()
        .nth(1)
        .or_else(|| env::var("TRACKLINE_GAME_ID").ok())
        .context("a game id is required (first argument or TRACKLINE_GAME_ID)")?;

    let clock = Arc::new(ServerClock::new());
    let api = TracklineClient::new(&config.api_url, config.request_timeout(), clock.clone())
        .context("building Trackline client")?;

    let mut builder = AppState::builder(Arc::new(api))
        .clock(clock)
        .event_capacity(config.event_capacity);
    if let Ok(token) = env::var("SPOTIFY_ACCESS_TOKEN") {
        let spotify = SpotifyClient::new(&config.spotify_api_url, &token, config.request_timeout())
            .context("building Spotify client")?;
        builder = builder.spotify(spotify);
    }
    let state = builder.build();

    let hook = resync::spawn(state.clone());
    state.enter_game(&game_id).await;
    info!(game_id = %game_id, api_url = %config.api_url, "following game");

    tokio::spawn(log_failures(state.clone()));
    let follower = tokio::spawn(follow_game(state.clone(), game_id));

    shutdown_signal().await;
    follower.abort();
    hook.abort();

    let ledger = serde_json::to_string(&state.ledger_snapshot()).unwrap_or_default();
    info!(%ledger, "shutting down");
    Ok(())
}

/// Poll the game, backing off while the backend keeps failing.
async fn follow_game(state: SharedState, game_id: String) {
    let fetch = game_service::fetch_game();
    let mut delay = INITIAL_DELAY;

    loop {
        match fetch.dispatch(&state, game_id.clone()).await {
            Settled::Fulfilled(game) => {
                info!(
                    game_id = %game.id,
                    state = ?game.state,
                    players = game.players.len(),
                    active_turn = ?game.active_turn().map(|turn| turn.id.as_str()),
                    clock_deviation_ms = state.clock().deviation_ms(),
                    "game refreshed"
                );
                delay = INITIAL_DELAY;
            }
            Settled::Rejected(err) => {
                warn!(game_id = %game_id, error = %err, retry_in = ?delay, "failed to refresh game");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        }
        sleep(delay).await;
    }
}

/// Log every failure recorded in the ledger.
async fn log_failures(state: SharedState) {
    let mut events = state.subscribe();
    loop {
        match events.recv().await {
            Ok(StatusEvent::Failed { id, error, .. }) => {
                warn!(operation = %id, code = %error.code(), error = %error, "operation failed");
            }
            Ok(event) => debug!(?event, "status event"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "status log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Log to stderr, honouring `RUST_LOG` and defaulting to debug output for this crate.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,trackline_client=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait until the follower should stop, reporting which signal ended it.
async fn shutdown_signal() {
    #[cfg(unix)]
    let signal = {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => "ctrl-c",
            _ = term.recv() => "SIGTERM",
        }
    };

    #[cfg(not(unix))]
    let signal = {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    };

    info!(signal, "stop requested");
}

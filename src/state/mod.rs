pub mod clock;
pub mod events;
pub mod ledger;

use std::sync::{Arc, PoisonError, RwLock as SyncRwLock};

use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::debug;

use crate::{
    api::{GameApi, spotify::SpotifyClient},
    dto::game::Game,
    error::AppError,
    services::reporter::{ErrorReporter, TracingReporter},
};

pub use self::clock::ServerClock;
pub use self::events::{EventHub, InvocationId, OperationId, StatusEvent};
pub use self::ledger::StatusLedger;

pub type SharedState = Arc<AppState>;
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Game the local player currently takes part in.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub game_id: String,
    /// Last copy fetched from or returned by the backend.
    pub game: Option<Game>,
}

/// Central client state: the status ledger, its event hub, the game session and API handles.
pub struct AppState {
    ledger: SyncRwLock<StatusLedger>,
    events: EventHub,
    session: RwLock<Option<GameSession>>,
    games: Arc<dyn GameApi>,
    spotify: Option<SpotifyClient>,
    reporter: Arc<dyn ErrorReporter>,
    clock: Arc<ServerClock>,
}

impl AppState {
    /// Start building state around the given Trackline API implementation.
    pub fn builder(games: Arc<dyn GameApi>) -> AppStateBuilder {
        AppStateBuilder {
            games,
            spotify: None,
            reporter: None,
            clock: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Apply `event` to the ledger, then publish it to subscribers.
    ///
    /// Publication happens under the ledger lock so observers see events in
    /// the order they were applied.
    pub fn dispatch(&self, event: StatusEvent) {
        let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
        ledger.reduce(&event);
        self.events.broadcast(event);
    }

    /// Whether an invocation of `id` is in flight.
    pub fn is_pending(&self, id: &OperationId) -> bool {
        self.ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_pending(id)
    }

    /// Error left by the last failed invocation of `id`.
    pub fn last_error(&self, id: &OperationId) -> Option<AppError> {
        self.ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_error(id)
            .cloned()
    }

    /// Copy of the whole ledger.
    pub fn ledger_snapshot(&self) -> StatusLedger {
        self.ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear the last error of `id`, leaving its pending flag alone.
    pub fn dismiss(&self, id: OperationId) {
        self.dispatch(StatusEvent::Dismissed { id });
    }

    /// Clear every recorded error.
    pub fn dismiss_all(&self) {
        self.dispatch(StatusEvent::DismissedAll);
    }

    /// Return the ledger to its empty initial state.
    pub fn reset(&self) {
        self.dispatch(StatusEvent::Reset);
    }

    /// Subscribe to every event applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Receive every [`StatusEvent::Failed`] applied from now on, in order and without loss.
    pub fn watch_failures(&self) -> mpsc::UnboundedReceiver<StatusEvent> {
        self.events.watch_failures()
    }

    /// Trackline API used by game operations.
    pub fn games(&self) -> &Arc<dyn GameApi> {
        &self.games
    }

    /// Spotify client, when an access token was configured.
    pub fn spotify(&self) -> Option<&SpotifyClient> {
        self.spotify.as_ref()
    }

    /// Sink for failures the classifier could not recognise.
    pub fn reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.reporter
    }

    /// Deviation between the local clock and the backend clock.
    pub fn clock(&self) -> &Arc<ServerClock> {
        &self.clock
    }

    /// Make `game_id` the active session, dropping any previously cached game.
    pub async fn enter_game(&self, game_id: impl Into<String>) {
        let game_id = game_id.into();
        debug!(game_id = %game_id, "entering game session");
        let mut slot = self.session.write().await;
        *slot = Some(GameSession {
            game_id,
            game: None,
        });
    }

    /// Forget the active session.
    pub async fn leave_game(&self) {
        let mut slot = self.session.write().await;
        if let Some(session) = slot.take() {
            debug!(game_id = %session.game_id, "left game session");
        }
    }

    /// Identifier of the active game, if any.
    pub async fn current_game_id(&self) -> Option<String> {
        let guard = self.session.read().await;
        guard.as_ref().map(|session| session.game_id.clone())
    }

    /// Last known copy of the active game.
    pub async fn current_game(&self) -> Option<Game> {
        let guard = self.session.read().await;
        guard.as_ref().and_then(|session| session.game.clone())
    }

    /// Cache `game` when it belongs to the active session. Returns whether it was stored.
    pub async fn store_game(&self, game: Game) -> bool {
        let mut slot = self.session.write().await;
        match slot.as_mut() {
            Some(session) if session.game_id == game.id => {
                session.game = Some(game);
                true
            }
            _ => false,
        }
    }
}

/// Builder for [`AppState`].
pub struct AppStateBuilder {
    games: Arc<dyn GameApi>,
    spotify: Option<SpotifyClient>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    clock: Option<Arc<ServerClock>>,
    event_capacity: usize,
}

impl AppStateBuilder {
    /// Enable Spotify-backed operations.
    pub fn spotify(mut self, client: SpotifyClient) -> Self {
        self.spotify = Some(client);
        self
    }

    /// Replace the default [`TracingReporter`].
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Share the clock already fed by the HTTP client.
    pub fn clock(mut self, clock: Arc<ServerClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Capacity of the broadcast channel carrying status events.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Finish construction, wrapping the state in an [`Arc`].
    pub fn build(self) -> SharedState {
        Arc::new(AppState {
            ledger: SyncRwLock::new(StatusLedger::new()),
            events: EventHub::new(self.event_capacity),
            session: RwLock::new(None),
            games: self.games,
            spotify: self.spotify,
            reporter: self
                .reporter
                .unwrap_or_else(|| Arc::new(TracingReporter)),
            clock: self.clock.unwrap_or_default(),
        })
    }
}

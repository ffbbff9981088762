//! Wrapped Trackline game operations.

use tracing::info;
use validator::Validate;

use crate::{
    dto::game::{CreateGameRequest, Game, GuessRequest, JoinGameRequest},
    error::{AppError, OperationError},
    services::operation::{AsyncOperation, OperationContext, wrap},
    state::OperationId,
};

pub const FETCH_GAME: OperationId = OperationId::from_static("games/fetchGame");
pub const CREATE_GAME: OperationId = OperationId::from_static("games/createGame");
pub const JOIN_GAME: OperationId = OperationId::from_static("games/joinGame");
pub const START_GAME: OperationId = OperationId::from_static("games/startGame");
pub const CREATE_TURN: OperationId = OperationId::from_static("games/createTurn");
pub const GUESS_TURN: OperationId = OperationId::from_static("games/guessTurn");

/// Payload of [`join_game`].
#[derive(Debug, Clone)]
pub struct JoinGame {
    pub game_id: String,
    pub request: JoinGameRequest,
}

/// Payload of [`guess_turn`].
#[derive(Debug, Clone)]
pub struct TurnGuess {
    pub game_id: String,
    pub turn_id: String,
    pub guess: GuessRequest,
}

/// Fetch a game and refresh the session copy when it is the active one.
pub fn fetch_game() -> AsyncOperation<String, Game> {
    wrap(FETCH_GAME, |game_id: String, context: OperationContext| async move {
        let game = context.state().games().fetch_game(&game_id).await?;
        context.state().store_game(game.clone()).await;
        Ok::<_, OperationError>(game)
    })
}

/// Create a game hosted by the local player and make it the active session.
pub fn create_game() -> AsyncOperation<CreateGameRequest, Game> {
    wrap(
        CREATE_GAME,
        |request: CreateGameRequest, context: OperationContext| async move {
            request.validate().map_err(invalid_payload)?;
            let game = context.state().games().create_game(request).await?;
            info!(game_id = %game.id, "created game");
            enter(&context, game.clone()).await;
            Ok::<_, OperationError>(game)
        },
    )
}

/// Join an existing game and make it the active session.
pub fn join_game() -> AsyncOperation<JoinGame, Game> {
    wrap(JOIN_GAME, |payload: JoinGame, context: OperationContext| async move {
        payload.request.validate().map_err(invalid_payload)?;
        let game = context
            .state()
            .games()
            .join_game(&payload.game_id, payload.request)
            .await?;
        info!(game_id = %game.id, "joined game");
        enter(&context, game.clone()).await;
        Ok::<_, OperationError>(game)
    })
}

/// Start an open game.
pub fn start_game() -> AsyncOperation<String, Game> {
    wrap(START_GAME, |game_id: String, context: OperationContext| async move {
        let game = context.state().games().start_game(&game_id).await?;
        context.state().store_game(game.clone()).await;
        Ok::<_, OperationError>(game)
    })
}

/// Open the next turn of a started game.
pub fn create_turn() -> AsyncOperation<String, Game> {
    wrap(CREATE_TURN, |game_id: String, context: OperationContext| async move {
        let game = context.state().games().create_turn(&game_id).await?;
        context.state().store_game(game.clone()).await;
        Ok::<_, OperationError>(game)
    })
}

/// Submit the local player's guess for a turn.
pub fn guess_turn() -> AsyncOperation<TurnGuess, Game> {
    wrap(GUESS_TURN, |payload: TurnGuess, context: OperationContext| async move {
        payload.guess.validate().map_err(invalid_payload)?;
        let game = context
            .state()
            .games()
            .guess_turn(&payload.game_id, &payload.turn_id, payload.guess)
            .await?;
        context.state().store_game(game.clone()).await;
        Ok::<_, OperationError>(game)
    })
}

async fn enter(context: &OperationContext, game: Game) {
    context.state().enter_game(game.id.clone()).await;
    context.state().store_game(game).await;
}

fn invalid_payload(errors: validator::ValidationErrors) -> OperationError {
    AppError::unexpected(format!("invalid payload: {errors}")).into()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;

    use super::*;
    use crate::{
        api::testing::FakeGameApi,
        dto::game::GameState,
        error::ErrorCode,
        state::{AppState, SharedState},
    };

    fn state(api: FakeGameApi) -> SharedState {
        AppState::builder(Arc::new(api)).build()
    }

    #[tokio::test]
    async fn fetch_refreshes_active_session() {
        let (api, mut fetched) = FakeGameApi::new();
        let state = state(api);
        state.enter_game("abc123").await;

        let settled = fetch_game().dispatch(&state, "abc123".into()).await;

        assert!(settled.is_fulfilled());
        assert_eq!(fetched.recv().await.as_deref(), Some("abc123"));
        assert_eq!(
            state.current_game().await.map(|game| game.id),
            Some("abc123".to_string())
        );
    }

    #[tokio::test]
    async fn create_game_enters_session() {
        let (api, _fetched) = FakeGameApi::new();
        let state = state(api);

        let settled = create_game()
            .dispatch(
                &state,
                CreateGameRequest {
                    player_name: "Ada".into(),
                    goal: 10,
                },
            )
            .await;

        assert!(settled.is_fulfilled());
        assert_eq!(state.current_game_id().await.as_deref(), Some("new-game"));
        assert!(state.current_game().await.is_some());
    }

    #[tokio::test]
    async fn join_game_switches_session() {
        let (api, _fetched) = FakeGameApi::new();
        let state = state(api);
        state.enter_game("old-game").await;

        let settled = join_game()
            .dispatch(
                &state,
                JoinGame {
                    game_id: "abc123".into(),
                    request: JoinGameRequest {
                        player_name: "Grace".into(),
                    },
                },
            )
            .await;

        assert_eq!(settled.into_result().map(|game| game.id), Ok("abc123".to_string()));
        assert_eq!(state.current_game_id().await.as_deref(), Some("abc123"));
        assert!(state.current_game().await.is_some());
        assert!(!state.is_pending(&JOIN_GAME));
    }

    #[tokio::test]
    async fn start_game_refreshes_active_session() {
        let (api, _fetched) = FakeGameApi::new();
        let state = state(api);
        state.enter_game("abc123").await;

        let settled = start_game().dispatch(&state, "abc123".into()).await;

        assert!(settled.is_fulfilled());
        assert!(state.last_error(&START_GAME).is_none());
        assert_eq!(
            state.current_game().await.map(|game| game.state),
            Some(GameState::Started)
        );
    }

    #[tokio::test]
    async fn invalid_guess_never_reaches_the_backend() {
        let (api, _fetched) = FakeGameApi::new();
        let state = state(api.failing_mutations(StatusCode::INTERNAL_SERVER_ERROR));

        let settled = guess_turn()
            .dispatch(
                &state,
                TurnGuess {
                    game_id: "abc123".into(),
                    turn_id: "t1".into(),
                    guess: GuessRequest {
                        position: 0,
                        release_year: Some(3000),
                        artist: None,
                        title: None,
                    },
                },
            )
            .await;

        assert_eq!(
            settled.error().map(|err| err.code()),
            Some(ErrorCode::Unexpected)
        );
        assert!(state.last_error(&GUESS_TURN).is_some());
    }

    #[tokio::test]
    async fn rejected_mutation_is_recorded() {
        let (api, _fetched) = FakeGameApi::new();
        let state = state(api.failing_mutations(StatusCode::CONFLICT));

        let settled = create_turn().dispatch(&state, "abc123".into()).await;

        let error = settled.error().unwrap();
        assert_eq!(error.code(), ErrorCode::RemoteApi);
        assert_eq!(error.status_code(), Some(409));
        assert_eq!(state.last_error(&CREATE_TURN).as_ref(), Some(error));
    }
}

//! HTTP clients for the Trackline backend and the Spotify Web API.

pub mod error;
pub mod spotify;
pub mod trackline;

use futures::future::BoxFuture;

use crate::{
    api::error::ApiResult,
    dto::game::{CreateGameRequest, Game, GuessRequest, JoinGameRequest},
};

/// Abstraction over the Trackline game endpoints.
pub trait GameApi: Send + Sync {
    fn fetch_game(&self, game_id: &str) -> BoxFuture<'static, ApiResult<Game>>;
    fn create_game(&self, request: CreateGameRequest) -> BoxFuture<'static, ApiResult<Game>>;
    fn join_game(
        &self,
        game_id: &str,
        request: JoinGameRequest,
    ) -> BoxFuture<'static, ApiResult<Game>>;
    fn start_game(&self, game_id: &str) -> BoxFuture<'static, ApiResult<Game>>;
    fn create_turn(&self, game_id: &str) -> BoxFuture<'static, ApiResult<Game>>;
    fn guess_turn(
        &self,
        game_id: &str,
        turn_id: &str,
        request: GuessRequest,
    ) -> BoxFuture<'static, ApiResult<Game>>;
}

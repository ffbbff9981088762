//! Resynchronize the active game after the backend rejected one of our calls.

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

use crate::{
    error::{AppError, ErrorCode},
    services::game_service::{FETCH_GAME, fetch_game},
    state::{OperationId, SharedState, StatusEvent},
};

/// Whether a failure of `operation` with `error` warrants refetching the game.
///
/// Failures of the fetch itself never qualify, so a failing resync cannot loop.
pub fn should_resync(operation: &OperationId, error: &AppError) -> bool {
    *operation != FETCH_GAME
        && error.code() == ErrorCode::RemoteApi
        && error.status_code().is_some_and(|status| status >= 400)
}

/// Observe every failure and refetch the active game after client-side rejections.
///
/// The watch is registered before this function returns and never lags, so no
/// failure is skipped. Each qualifying failure spawns exactly one
/// `games/fetchGame` invocation, which reports through the ledger like any
/// other call.
pub fn spawn(state: SharedState) -> JoinHandle<()> {
    let mut failures = UnboundedReceiverStream::new(state.watch_failures());
    let fetch = fetch_game();

    tokio::spawn(async move {
        while let Some(event) = failures.next().await {
            let StatusEvent::Failed { id, error, .. } = event else {
                continue;
            };
            if !should_resync(&id, &error) {
                continue;
            }
            let Some(game_id) = state.current_game_id().await else {
                continue;
            };

            info!(
                operation = %id,
                game_id = %game_id,
                status = ?error.status_code(),
                "request rejected; resynchronizing game"
            );
            let state = state.clone();
            let fetch = fetch.clone();
            tokio::spawn(async move {
                fetch.dispatch(&state, game_id).await;
            });
        }
        debug!("failure stream closed; resync hook stopped");
    })
}

//! Wrapped Spotify operations.

use crate::{
    dto::spotify::Track,
    error::{AppError, OperationError},
    services::operation::{AsyncOperation, OperationContext, wrap},
    state::OperationId,
};

pub const FETCH_TRACK: OperationId = OperationId::from_static("spotify/fetchTrack");

/// Look up a track in the Spotify catalog.
pub fn fetch_track() -> AsyncOperation<String, Track> {
    wrap(
        FETCH_TRACK,
        |track_id: String, context: OperationContext| async move {
            let Some(client) = context.state().spotify() else {
                return Err(OperationError::from(AppError::external_service(
                    "spotify client not configured",
                    None,
                    None,
                )));
            };
            client.track(&track_id).await.map_err(OperationError::Spotify)
        },
    )
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        api::{
            spotify::SpotifyClient,
            testing::{FakeGameApi, serve_once},
        },
        error::ErrorCode,
        state::AppState,
    };

    #[tokio::test]
    async fn missing_client_is_external_failure() {
        let (api, _fetched) = FakeGameApi::new();
        let state = AppState::builder(Arc::new(api)).build();

        let settled = fetch_track().dispatch(&state, "4uLU6hMCjMI75M1A2tKUQC".into()).await;

        assert_eq!(
            state.last_error(&FETCH_TRACK).map(|err| err.code()),
            Some(ErrorCode::ExternalServiceApi)
        );
        assert!(!settled.is_fulfilled());
    }

    #[tokio::test]
    async fn fetched_track_is_returned_and_clears_pending() {
        let base = serve_once(
            "200 OK",
            "",
            r#"{"id":"7tFiyTwD0nx5a1eklYtX2J","name":"Bohemian Rhapsody","duration_ms":354320,
                "artists":[{"id":"1dfeR4HaWDbWqFHLkxsg1d","name":"Queen"}],
                "album":{"name":"A Night at the Opera","release_date":"1975-11-21"}}"#,
        )
        .await;
        let (api, _fetched) = FakeGameApi::new();
        let spotify = SpotifyClient::new(&base, "token", Duration::from_secs(5)).unwrap();
        let state = AppState::builder(Arc::new(api)).spotify(spotify).build();

        let track = fetch_track()
            .dispatch(&state, "7tFiyTwD0nx5a1eklYtX2J".into())
            .await
            .into_result()
            .unwrap();

        assert_eq!(track.name, "Bohemian Rhapsody");
        assert_eq!(track.release_year(), Some(1975));
        assert!(!state.is_pending(&FETCH_TRACK));
        assert!(state.last_error(&FETCH_TRACK).is_none());
    }

    #[tokio::test]
    async fn spotify_rejection_is_external_service_error() {
        let base = serve_once("429 Too Many Requests", "", r#"{"error":{"status":429}}"#).await;
        let (api, _fetched) = FakeGameApi::new();
        let spotify = SpotifyClient::new(&base, "token", Duration::from_secs(5)).unwrap();
        let state = AppState::builder(Arc::new(api)).spotify(spotify).build();

        let settled = fetch_track().dispatch(&state, "4uLU6hMCjMI75M1A2tKUQC".into()).await;

        let error = settled.error().unwrap();
        assert_eq!(error.code(), ErrorCode::ExternalServiceApi);
        assert_eq!(error.status_code(), Some(429));
    }
}

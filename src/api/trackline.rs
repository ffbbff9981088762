use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    api::{
        GameApi,
        error::{ApiResult, ClientError},
    },
    dto::game::{CreateGameRequest, Game, GuessRequest, JoinGameRequest},
    state::clock::{SERVER_TIME_HEADER, ServerClock},
};

/// HTTP client for the Trackline game backend.
#[derive(Clone)]
pub struct TracklineClient {
    client: Client,
    base_url: Arc<str>,
    clock: Arc<ServerClock>,
}

impl TracklineClient {
    /// Build a client rooted at `base_url` that feeds server time into `clock`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        clock: Arc<ServerClock>,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            clock,
        })
    }

    async fn send<B, T>(&self, method: Method, path: String, body: Option<&B>) -> ApiResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.clone(),
                source,
            })?;

        let response = intercept(response, &path, Some(&self.clock)).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| ClientError::Decode { path, source })
    }
}

/// Shared response interceptor: records server time, then turns any non-success
/// status into [`ClientError::Status`] with the decoded JSON body when present.
pub(crate) async fn intercept(
    response: Response,
    path: &str,
    clock: Option<&ServerClock>,
) -> ApiResult<Response> {
    if let Some(clock) = clock {
        if let Some(value) = response
            .headers()
            .get(SERVER_TIME_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            clock.observe(value);
        }
    }

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.json::<Value>().await.ok();
    Err(ClientError::Status {
        path: path.to_string(),
        status,
        body,
    })
}

impl GameApi for TracklineClient {
    fn fetch_game(&self, game_id: &str) -> BoxFuture<'static, ApiResult<Game>> {
        let client = self.clone();
        let path = format!("games/{game_id}");
        Box::pin(async move { client.send::<(), _>(Method::GET, path, None).await })
    }

    fn create_game(&self, request: CreateGameRequest) -> BoxFuture<'static, ApiResult<Game>> {
        let client = self.clone();
        Box::pin(async move {
            client
                .send(Method::POST, "games".to_string(), Some(&request))
                .await
        })
    }

    fn join_game(
        &self,
        game_id: &str,
        request: JoinGameRequest,
    ) -> BoxFuture<'static, ApiResult<Game>> {
        let client = self.clone();
        let path = format!("games/{game_id}/players");
        Box::pin(async move { client.send(Method::POST, path, Some(&request)).await })
    }

    fn start_game(&self, game_id: &str) -> BoxFuture<'static, ApiResult<Game>> {
        let client = self.clone();
        let path = format!("games/{game_id}/start");
        Box::pin(async move { client.send::<(), _>(Method::POST, path, None).await })
    }

    fn create_turn(&self, game_id: &str) -> BoxFuture<'static, ApiResult<Game>> {
        let client = self.clone();
        let path = format!("games/{game_id}/turns");
        Box::pin(async move { client.send::<(), _>(Method::POST, path, None).await })
    }

    fn guess_turn(
        &self,
        game_id: &str,
        turn_id: &str,
        request: GuessRequest,
    ) -> BoxFuture<'static, ApiResult<Game>> {
        let client = self.clone();
        let path = format!("games/{game_id}/turns/{turn_id}/guesses");
        Box::pin(async move { client.send(Method::POST, path, Some(&request)).await })
    }
}

use std::{sync::Arc, time::Duration};

use reqwest::Client;

use crate::{
    api::{
        error::{ApiResult, ClientError},
        trackline::intercept,
    },
    dto::spotify::Track,
};

/// Default root of the Spotify Web API.
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Minimal Spotify Web API client authenticated with a bearer token.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    base_url: Arc<str>,
    access_token: Arc<str>,
}

impl SpotifyClient {
    /// Build a client for `base_url` using the given OAuth access token.
    pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            access_token: Arc::from(access_token),
        })
    }

    /// Fetch catalog information for a single track.
    pub async fn track(&self, track_id: &str) -> ApiResult<Track> {
        let path = format!("tracks/{track_id}");
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .bearer_auth(self.access_token.as_ref())
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.clone(),
                source,
            })?;

        let response = intercept(response, &path, None).await?;
        response
            .json::<Track>()
            .await
            .map_err(|source| ClientError::Decode { path, source })
    }
}

//! Client configuration loading: API endpoints, timeouts and event buffering.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use anyhow::bail;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use validator::Validate;

use crate::{api::spotify::SPOTIFY_API_URL, state::DEFAULT_EVENT_CAPACITY};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRACKLINE_CLIENT_CONFIG_PATH";
const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Immutable runtime configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Root of the Trackline REST API.
    #[validate(url)]
    pub api_url: String,
    /// Root of the Spotify Web API.
    #[validate(url)]
    pub spotify_api_url: String,
    /// Per-request deadline applied by both HTTP clients.
    #[validate(range(min = 100, max = 120_000))]
    pub request_timeout_ms: u64,
    /// Capacity of the status event broadcast channel.
    #[validate(range(min = 1, max = 65_536))]
    pub event_capacity: usize,
}

impl ClientConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), api_url = %config.api_url, "loaded client config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "invalid config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a JSON object. Missing keys take their default value.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let value = serde_json::from_str::<Value>(contents)?;
        if !value.is_object() {
            bail!("client config must be a JSON object");
        }
        let config = serde_json::from_value::<Self>(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Request deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            spotify_api_url: SPOTIFY_API_URL.into(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

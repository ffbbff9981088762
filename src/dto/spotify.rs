use serde::{Deserialize, Serialize};

/// Subset of the Spotify track object used by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<Artist>,
    pub album: Album,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    /// Release year parsed from the album date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
    pub fn release_year(&self) -> Option<i32> {
        self.album.release_date.get(..4)?.parse().ok()
    }
}

/// Artist credited on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// Album the track was released on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    pub release_date: String,
}

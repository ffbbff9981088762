use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle of a game on the Trackline backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    /// Players may still join.
    Open,
    /// Turns are being played.
    Started,
    /// A winner was determined or the host ended the game.
    Ended,
}

/// Game as returned by the Trackline backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub state: GameState,
    /// Player id of the host.
    pub host: String,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub turns: Vec<Turn>,
    /// Number of tracks on a timeline required to win.
    #[serde(default)]
    pub goal: Option<u32>,
}

impl Game {
    /// Turn currently being played, if any.
    pub fn active_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| !turn.completed)
    }
}

/// A participant and their personal timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    /// Tokens earned by naming artists/titles and spent on skips or steals.
    #[serde(default)]
    pub tokens: u32,
    #[serde(default)]
    pub timeline: Vec<TimelineTrack>,
}

/// A track placed on a player's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub release_year: i32,
}

/// One round where the active player places the current track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub active_player_id: String,
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Payload creating a new game hosted by `player_name`.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    #[validate(length(min = 1, max = 32))]
    pub player_name: String,
    #[validate(range(min = 1, max = 50))]
    pub goal: u32,
}

/// Payload joining an existing game.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    #[validate(length(min = 1, max = 32))]
    pub player_name: String,
}

/// A player's guess for the current track.
///
/// `position` is the slot on the guesser's timeline the track is inserted
/// before; artist and title are optional and earn tokens when correct.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1900, max = 2100))]
    pub release_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub title: Option<String>,
}

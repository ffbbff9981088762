/// Wrapped Trackline game operations.
pub mod game_service;
/// Safe wrapper turning async operations into status events.
pub mod operation;
/// Sink for unexpected failures.
pub mod reporter;
/// Game resynchronization after rejected requests.
pub mod resync;
/// Wrapped Spotify operations.
pub mod spotify_service;

//! Wire shapes exchanged with the Trackline and Spotify APIs.

pub mod game;
pub mod spotify;

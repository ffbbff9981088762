//! Client core of the Trackline music-guessing game: normalized errors, wrapped
//! asynchronous operations, and the status ledger they report into.

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;

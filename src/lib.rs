//! Motif: one connection and one playback feed over Spotify and Apple Music.
//!
//! [`player`] holds the negotiation layer and both service adapters; [`app`]
//! is the command-line front end built on it.

pub mod app;
pub mod config;
pub mod player;

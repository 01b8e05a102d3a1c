//! Playback session and its collaborators.

pub mod backend;
pub mod commands;
mod engine;
pub mod error;
pub mod events;
pub mod notify;
pub mod platform;
pub mod probe;
pub mod queue;
pub mod source;
pub mod state;

pub use engine::{PlaybackSession, SessionBuilder};

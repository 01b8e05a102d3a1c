//! Command surface for UI hosts (webview bridge, mobile FFI).
//!
//! Hosts send one JSON object per call, e.g.
//! `{"command": "play_track", "track": {...}}`, and get the resulting
//! snapshot back.

use serde::Deserialize;

use crate::audio::engine::PlaybackSession;
use crate::audio::state::{PlaybackSnapshot, Track};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    PlayTrack {
        track: Track,
    },
    Pause,
    Resume,
    TogglePlay,
    Stop,
    #[serde(rename_all = "camelCase")]
    Seek {
        position_ms: u64,
    },
    SeekPercent {
        percent: f64,
    },
    AddToQueue {
        track: Track,
    },
    ClearQueue,
    GetState,
}

/// Apply `command` and return the state once the session has handled it.
///
/// Loads that still wait on the reachability probe report `isLoading`.
pub fn dispatch(session: &PlaybackSession, command: Command) -> PlaybackSnapshot {
    match command {
        Command::PlayTrack { track } => session.play_track(track),
        Command::Pause => session.pause(),
        Command::Resume => session.resume(),
        Command::TogglePlay => session.toggle_play(),
        Command::Stop => session.stop(),
        Command::Seek { position_ms } => session.seek_to(position_ms),
        Command::SeekPercent { percent } => session.seek_percent(percent),
        Command::AddToQueue { track } => session.add_to_queue(track),
        Command::ClearQueue => session.clear_queue(),
        Command::GetState => {}
    }
    session.flush();
    session.state()
}

/// Parse a raw host message, dispatch it and serialize the snapshot.
pub fn dispatch_json(session: &PlaybackSession, raw: &str) -> Result<serde_json::Value, String> {
    let command: Command =
        serde_json::from_str(raw).map_err(|e| format!("Invalid command: {}", e))?;
    log::trace!("Host command: {:?}", command);
    serde_json::to_value(dispatch(session, command))
        .map_err(|e| format!("Failed to serialize state: {}", e))
}

//! Error types for the playback session.
//!
//! None of these escape the public session operations; they travel between
//! the session thread, its backend and the probe, and end up in logs,
//! `SessionState::error` and (translated) in user-facing toasts.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The probe could not reach the source, or the server refused it.
    #[error("Audio source unreachable: {url} ({reason})")]
    Unreachable { url: String, reason: String },

    /// The probe did not get an answer in time.
    #[error("Reachability probe timed out after {timeout:?}: {url}")]
    ProbeTimeout { url: String, timeout: Duration },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unsupported audio format: {0}")]
    Decode(String),

    /// No usable audio output device.
    #[error("Audio output unavailable: {0}")]
    Output(String),

    /// Runtime failure reported by a backend after playback was started.
    #[error("Playback backend error: {0}")]
    Backend(String),

    #[error("Playback session is closed")]
    SessionClosed,

    /// Settings rejected by `Settings::validate`.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl PlaybackError {
    /// Whether the failure means the source itself can't be played, as
    /// opposed to something going wrong on our side.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            PlaybackError::Unreachable { .. }
                | PlaybackError::ProbeTimeout { .. }
                | PlaybackError::Backend(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

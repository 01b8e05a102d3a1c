use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audio::queue::Queue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub composer: String,
    pub audio_url: String,
    /// Advisory only; the backend reports the real duration once loaded.
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        composer: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            composer: composer.into(),
            audio_url: audio_url.into(),
            duration_secs: None,
            image_url: None,
        }
    }

    pub fn with_duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn same_as(&self, other: &Track) -> bool {
        self.id == other.id
    }

    pub(crate) fn duration_hint_ms(&self) -> u64 {
        self.duration_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| (secs * 1000.0).round() as u64)
            .unwrap_or(0)
    }
}

/// Where the session is in its lifecycle.
///
/// Playing and paused always carry the track, so a "playing nothing" state
/// can't be built.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Loading {
        track: Track,
    },
    Playing {
        track: Track,
        position_ms: u64,
        duration_ms: u64,
    },
    Paused {
        track: Track,
        position_ms: u64,
        duration_ms: u64,
    },
}

impl PlaybackPhase {
    pub fn track(&self) -> Option<&Track> {
        match self {
            PlaybackPhase::Idle => None,
            PlaybackPhase::Loading { track }
            | PlaybackPhase::Playing { track, .. }
            | PlaybackPhase::Paused { track, .. } => Some(track),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackPhase::Playing { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PlaybackPhase::Loading { .. })
    }

    pub fn position_ms(&self) -> u64 {
        match self {
            PlaybackPhase::Playing { position_ms, .. }
            | PlaybackPhase::Paused { position_ms, .. } => *position_ms,
            _ => 0,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match self {
            PlaybackPhase::Playing { duration_ms, .. }
            | PlaybackPhase::Paused { duration_ms, .. } => *duration_ms,
            PlaybackPhase::Loading { track } => track.duration_hint_ms(),
            PlaybackPhase::Idle => 0,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        match self {
            PlaybackPhase::Idle => PlaybackStatus::Idle,
            PlaybackPhase::Loading { .. } => PlaybackStatus::Loading,
            PlaybackPhase::Playing { .. } => PlaybackStatus::Playing,
            PlaybackPhase::Paused { .. } => PlaybackStatus::Paused,
        }
    }

    /// Playing -> Paused, keeping position and duration. Other phases are
    /// returned unchanged.
    pub(crate) fn into_paused(self) -> Self {
        match self {
            PlaybackPhase::Playing {
                track,
                position_ms,
                duration_ms,
            } => PlaybackPhase::Paused {
                track,
                position_ms,
                duration_ms,
            },
            other => other,
        }
    }

    /// Paused -> Playing. Other phases are returned unchanged.
    pub(crate) fn into_playing(self) -> Self {
        match self {
            PlaybackPhase::Paused {
                track,
                position_ms,
                duration_ms,
            } => PlaybackPhase::Playing {
                track,
                position_ms,
                duration_ms,
            },
            other => other,
        }
    }

    pub(crate) fn set_position_ms(&mut self, position: u64) {
        if let PlaybackPhase::Playing { position_ms, .. }
        | PlaybackPhase::Paused { position_ms, .. } = self
        {
            *position_ms = position;
        }
    }

    pub(crate) fn set_duration_ms(&mut self, duration: u64) {
        if let PlaybackPhase::Playing { duration_ms, .. }
        | PlaybackPhase::Paused { duration_ms, .. } = self
        {
            *duration_ms = duration;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: PlaybackPhase,
    pub queue: Queue,
    /// Description of the last failure, cleared when a new track loads.
    pub error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.into()
    }
}

/// Read-only copy of the session state handed to UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub is_loading: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub queue: Vec<Track>,
    pub error: Option<String>,
}

impl From<&SessionState> for PlaybackSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            status: state.phase.status(),
            current_track: state.phase.track().cloned(),
            is_playing: state.phase.is_playing(),
            is_loading: state.phase.is_loading(),
            position_ms: state.phase.position_ms(),
            duration_ms: state.phase.duration_ms(),
            queue: state.queue.tracks().to_vec(),
            error: state.error.clone(),
        }
    }
}

pub type SharedState = Arc<RwLock<SessionState>>;

pub fn create_shared_state() -> SharedState {
    Arc::new(RwLock::new(SessionState::new()))
}

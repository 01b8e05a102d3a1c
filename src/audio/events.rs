use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;

use crate::audio::state::{PlaybackSnapshot, SessionState, Track};

/// Notifications pushed to UI consumers (mini-players, now-playing bars).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(PlaybackSnapshot),
    TrackChanged(Track),
    TrackEnded { track_id: String },
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackChangedPayload<'a> {
    track: &'a Track,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackEndedPayload<'a> {
    track_id: &'a str,
}

impl SessionEvent {
    /// Event name used by webview/mobile hosts.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged(_) => "audio:state",
            SessionEvent::TrackChanged(_) => "audio:track-changed",
            SessionEvent::TrackEnded { .. } => "audio:track-ended",
        }
    }

    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            SessionEvent::StateChanged(snapshot) => serde_json::to_value(snapshot),
            SessionEvent::TrackChanged(track) => {
                serde_json::to_value(TrackChangedPayload { track })
            }
            SessionEvent::TrackEnded { track_id } => serde_json::to_value(TrackEndedPayload {
                track_id: track_id.as_str(),
            }),
        }
    }
}

/// Fan-out of session events to any number of subscribers.
///
/// Subscribers whose receiver was dropped are pruned on the next emit.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<SessionEvent>>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

pub fn emit_state_update(bus: &EventBus, state: &SessionState) {
    bus.emit(SessionEvent::StateChanged(state.snapshot()));
}

pub fn emit_track_changed(bus: &EventBus, track: &Track) {
    bus.emit(SessionEvent::TrackChanged(track.clone()));
}

pub fn emit_track_ended(bus: &EventBus, track_id: &str) {
    bus.emit(SessionEvent::TrackEnded {
        track_id: track_id.to_string(),
    });
}

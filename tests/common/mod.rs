#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cadenza_lib::audio::platform::{AudioSessionConfigurator, AudioSessionOptions};
use cadenza_lib::{
    BackendEvents, BackendFactory, BackendKind, Notifier, PlaybackBackend, PlaybackError,
    PlaybackSession, PlaybackSnapshot, ReachabilityProbe, SessionEvent, Settings, ToastKind,
    Track,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Play,
    Pause,
    Seek(u64),
    Teardown,
}

/// Shared view into a [`ScriptedBackend`] living on the session thread.
#[derive(Clone, Default)]
pub struct BackendLog {
    calls: Arc<Mutex<Vec<Call>>>,
    events: Arc<Mutex<Vec<(String, BackendEvents)>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    failing_play: Arc<Mutex<bool>>,
    position: Arc<Mutex<Option<Duration>>>,
}

impl BackendLog {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Load(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == wanted).count()
    }

    /// Event sender the backend received for the latest load of `url`.
    pub fn events_for(&self, url: &str) -> BackendEvents {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|(loaded, _)| loaded == url)
            .map(|(_, events)| events.clone())
            .unwrap_or_else(|| panic!("{} was never loaded", url))
    }

    pub fn fail_loads_of(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    pub fn fail_play(&self, failing: bool) {
        *self.failing_play.lock() = failing;
    }

    /// Position the backend reports when asked directly.
    pub fn set_position_ms(&self, position_ms: u64) {
        *self.position.lock() = Some(Duration::from_millis(position_ms));
    }
}

pub struct ScriptedBackend {
    kind: BackendKind,
    log: BackendLog,
    loaded: bool,
}

impl PlaybackBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn load(&mut self, url: &str, events: BackendEvents) -> Result<(), PlaybackError> {
        self.log.calls.lock().push(Call::Load(url.to_string()));
        if self.log.failing.lock().contains(url) {
            return Err(PlaybackError::Decode("scripted decode failure".into()));
        }
        self.log.events.lock().push((url.to_string(), events));
        self.loaded = true;
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.log.calls.lock().push(Call::Play);
        if *self.log.failing_play.lock() {
            return Err(PlaybackError::Output("device went away".into()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.log.calls.lock().push(Call::Pause);
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        self.log
            .calls
            .lock()
            .push(Call::Seek(position.as_millis() as u64));
        Ok(())
    }

    fn teardown(&mut self) {
        self.log.calls.lock().push(Call::Teardown);
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn position(&self) -> Option<Duration> {
        if self.loaded {
            *self.log.position.lock()
        } else {
            None
        }
    }
}

pub fn scripted_factory(kind: BackendKind, log: BackendLog) -> BackendFactory {
    Box::new(move || -> Result<Box<dyn PlaybackBackend>, PlaybackError> {
        Ok(Box::new(ScriptedBackend {
            kind,
            log,
            loaded: false,
        }))
    })
}

#[derive(Default)]
pub struct ScriptedProbe {
    unreachable: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Receiver<()>>>,
    checked: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn mark_unreachable(&self, url: &str) {
        self.unreachable.lock().insert(url.to_string());
    }

    /// The next check of `url` blocks until the returned sender fires or is
    /// dropped.
    pub fn gate(&self, url: &str) -> Sender<()> {
        let (tx, rx) = bounded(1);
        self.gates.lock().insert(url.to_string(), rx);
        tx
    }

    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().clone()
    }
}

impl ReachabilityProbe for ScriptedProbe {
    fn check(&self, url: &str) -> Result<(), PlaybackError> {
        self.checked.lock().push(url.to_string());
        let gate = self.gates.lock().remove(url);
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if self.unreachable.lock().contains(url) {
            Err(PlaybackError::Unreachable {
                url: url.to_string(),
                reason: "scripted".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<(String, ToastKind)>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<(String, ToastKind)> {
        self.toasts.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show_toast(&self, message: &str, kind: ToastKind) {
        self.toasts.lock().push((message.to_string(), kind));
    }
}

#[derive(Clone, Default)]
pub struct RecordingAudioSession {
    pub applied: Arc<Mutex<Vec<AudioSessionOptions>>>,
}

impl AudioSessionConfigurator for RecordingAudioSession {
    fn configure(&mut self, options: &AudioSessionOptions) -> bool {
        self.applied.lock().push(*options);
        true
    }
}

pub struct Harness {
    pub session: PlaybackSession,
    pub backend: BackendLog,
    pub probe: Arc<ScriptedProbe>,
    pub notifier: Arc<RecordingNotifier>,
    pub events: Receiver<SessionEvent>,
}

pub fn harness(kind: BackendKind) -> Harness {
    let backend = BackendLog::default();
    let probe = Arc::new(ScriptedProbe::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let session = PlaybackSession::builder(
        Settings::default(),
        scripted_factory(kind, backend.clone()),
    )
    .probe(probe.clone())
    .notifier(notifier.clone())
    .spawn()
    .expect("session should spawn");
    let events = session.subscribe();

    Harness {
        session,
        backend,
        probe,
        notifier,
        events,
    }
}

/// Poll the session until `cond` holds, panicking after two seconds.
pub fn wait_until(
    session: &PlaybackSession,
    cond: impl Fn(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        session.flush();
        let state = session.state();
        if cond(&state) {
            return state;
        }
        if Instant::now() > deadline {
            panic!("condition not reached, last state: {:?}", state);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn bach() -> Track {
    Track::new(
        "bach-1",
        "Cello Suite No. 1: Prelude",
        "J. S. Bach",
        "https://samples.example/bach-1.mp3",
    )
    .with_duration_secs(150.0)
}

pub fn mozart() -> Track {
    Track::new(
        "mozart-2",
        "Rondo alla Turca",
        "W. A. Mozart",
        "https://unreachable.example/x.mp3",
    )
}

pub fn ravel() -> Track {
    Track::new(
        "ravel-3",
        "Boléro",
        "M. Ravel",
        "https://samples.example/ravel-3.mp3",
    )
}

/// `is_loading` values seen in state events, with repeats collapsed.
pub fn loading_transitions(events: &Receiver<SessionEvent>) -> Vec<bool> {
    let mut seen: Vec<bool> = Vec::new();
    for event in events.try_iter() {
        if let SessionEvent::StateChanged(state) = event {
            if seen.last() != Some(&state.is_loading) {
                seen.push(state.is_loading);
            }
        }
    }
    seen
}

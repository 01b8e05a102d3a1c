//! Playback session.
//!
//! Architecture:
//! - `PlaybackSession`: owned handle (Send + Sync) that sends commands to the session thread
//! - `SessionThread`: dedicated thread that owns the backend and processes commands in order
//! - Probe results and backend callbacks come back over a second channel as `Signal`s,
//!   tagged with the generation of the load they belong to
//! - SharedState (Arc<RwLock<SessionState>>) for reading state from any thread
//!
//! Every teardown of a backend resource bumps the generation, so a late probe
//! result or a callback from a previous track can never touch the state of the
//! current one.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::audio::backend::{BackendEvent, BackendEvents, BackendFactory, PlaybackBackend};
use crate::audio::error::PlaybackError;
use crate::audio::events::{self, EventBus, SessionEvent};
use crate::audio::notify::{LogNotifier, Notifier, ToastKind, AUDIO_UNAVAILABLE, PLAYBACK_FAILED};
use crate::audio::platform::{configure_audio_session, AudioSessionConfigurator, NoopAudioSession};
use crate::audio::probe::{HttpProbe, ReachabilityProbe};
use crate::audio::state::{create_shared_state, PlaybackPhase, PlaybackSnapshot, SharedState, Track};
use crate::config::Settings;

/// How often `flush` checks whether the session thread is still alive.
const FLUSH_POLL: Duration = Duration::from_millis(50);

/// Commands sent to the session thread
#[derive(Debug)]
pub(crate) enum SessionCommand {
    PlayTrack(Track),
    Pause,
    Resume,
    TogglePlay,
    Stop,
    Seek(u64),
    AddToQueue(Track),
    ClearQueue,
    Flush(Sender<()>),
    Shutdown,
}

/// Results coming back from probe threads and backends.
#[derive(Debug)]
pub(crate) enum Signal {
    ProbeFinished {
        generation: u64,
        result: Result<(), PlaybackError>,
    },
    Backend {
        generation: u64,
        event: BackendEvent,
    },
}

/// Configures and spawns a [`PlaybackSession`].
pub struct SessionBuilder {
    settings: Settings,
    backend: BackendFactory,
    notifier: Option<Arc<dyn Notifier>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    audio_session: Option<Box<dyn AudioSessionConfigurator>>,
}

impl SessionBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn audio_session(mut self, configurator: Box<dyn AudioSessionConfigurator>) -> Self {
        self.audio_session = Some(configurator);
        self
    }

    /// Spawn the session thread. Fails on settings that don't pass
    /// [`Settings::validate`].
    pub fn spawn(self) -> Result<PlaybackSession, PlaybackError> {
        self.settings
            .validate()
            .map_err(PlaybackError::InvalidSettings)?;

        let probe: Arc<dyn ReachabilityProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpProbe::new(&self.settings.probe)?),
        };
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));
        let audio_session = self
            .audio_session
            .unwrap_or_else(|| Box::new(NoopAudioSession));

        let (cmd_tx, cmd_rx) = bounded::<SessionCommand>(self.settings.playback.command_capacity);
        let (signal_tx, signal_rx) = unbounded::<Signal>();
        let state = create_shared_state();
        let bus = EventBus::default();

        let init = SessionInit {
            backend: self.backend,
            audio_session,
            settings: self.settings,
            state: state.clone(),
            bus: bus.clone(),
            notifier: notifier.clone(),
            probe,
            signal_tx,
        };

        let thread = thread::Builder::new()
            .name("cadenza-session".into())
            .spawn(move || SessionThread::run(init, cmd_rx, signal_rx))
            .map_err(|e| PlaybackError::Backend(format!("Failed to spawn session thread: {}", e)))?;

        log::info!("Playback session started");
        Ok(PlaybackSession {
            cmd_tx,
            state,
            bus,
            notifier,
            thread: Some(thread),
        })
    }
}

/// Handle to the playback session.
///
/// Operations never fail from the caller's point of view: problems end up in
/// the state, in a toast and in the log. Dropping the handle shuts the
/// session thread down.
pub struct PlaybackSession {
    cmd_tx: Sender<SessionCommand>,
    state: SharedState,
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    pub fn builder(settings: Settings, backend: BackendFactory) -> SessionBuilder {
        SessionBuilder {
            settings,
            backend,
            notifier: None,
            probe: None,
            audio_session: None,
        }
    }

    /// Session with the rodio backend selected in `settings`.
    #[cfg(feature = "rodio-output")]
    pub fn with_output(settings: Settings) -> Result<Self, PlaybackError> {
        let factory = crate::audio::backend::default_backend_factory(settings.playback.backend);
        Self::builder(settings, factory).spawn()
    }

    /// Play `track`, or toggle play/pause if it is already the current track.
    pub fn play_track(&self, track: Track) {
        log::info!("Playing track: {} - {}", track.composer, track.title);
        if let Err(e) = self.send(SessionCommand::PlayTrack(track)) {
            log::error!("Failed to play track: {}", e);
            self.notifier.show_toast(PLAYBACK_FAILED, ToastKind::Error);
        }
    }

    pub fn pause(&self) {
        let _ = self.send(SessionCommand::Pause);
    }

    pub fn resume(&self) {
        let _ = self.send(SessionCommand::Resume);
    }

    pub fn toggle_play(&self) {
        let _ = self.send(SessionCommand::TogglePlay);
    }

    pub fn stop(&self) {
        let _ = self.send(SessionCommand::Stop);
    }

    pub fn seek_to(&self, position_ms: u64) {
        let _ = self.send(SessionCommand::Seek(position_ms));
    }

    /// Seek to a percentage of the known duration.
    pub fn seek_percent(&self, percent: f64) {
        let duration_ms = self.state.read().phase.duration_ms();
        let fraction = if percent.is_finite() {
            (percent / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.seek_to((duration_ms as f64 * fraction).round() as u64);
    }

    pub fn add_to_queue(&self, track: Track) {
        let _ = self.send(SessionCommand::AddToQueue(track));
    }

    pub fn clear_queue(&self) {
        let _ = self.send(SessionCommand::ClearQueue);
    }

    pub fn state(&self) -> PlaybackSnapshot {
        self.state.read().snapshot()
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Block until every command sent before this call has been handled.
    ///
    /// Probe results and backend callbacks that arrive later are not waited
    /// for. Returns early if the session thread has died.
    pub fn flush(&self) {
        let (tx, rx) = bounded(1);
        if self.send(SessionCommand::Flush(tx)).is_err() {
            return;
        }
        // A thread that died with the ack still queued never answers.
        while let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(FLUSH_POLL) {
            if self.thread.as_ref().map_or(true, |t| t.is_finished()) {
                log::warn!("Session thread exited before flush completed");
                return;
            }
        }
    }

    fn send(&self, cmd: SessionCommand) -> Result<(), PlaybackError> {
        self.cmd_tx.send(cmd).map_err(|e| {
            log::warn!("Session thread not responding, dropped {:?}", e.into_inner());
            PlaybackError::SessionClosed
        })
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Session thread panicked");
            }
        }
    }
}

/// Everything the session thread needs, moved in at spawn time.
struct SessionInit {
    backend: BackendFactory,
    audio_session: Box<dyn AudioSessionConfigurator>,
    settings: Settings,
    state: SharedState,
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    probe: Arc<dyn ReachabilityProbe>,
    signal_tx: Sender<Signal>,
}

/// The session thread.
///
/// Owns the backend exclusively; all mutation of it happens here, one
/// command at a time, so tearing down the old track and loading the next one
/// can't interleave with anything else.
struct SessionThread {
    backend: Box<dyn PlaybackBackend>,
    state: SharedState,
    bus: EventBus,
    notifier: Arc<dyn Notifier>,
    probe: Arc<dyn ReachabilityProbe>,
    signal_tx: Sender<Signal>,
    /// Identifies the live backend resource; bumped on every teardown.
    generation: u64,
    tick_interval: Duration,
    last_tick: Instant,
}

impl SessionThread {
    /// Main loop for the session thread.
    fn run(init: SessionInit, cmd_rx: Receiver<SessionCommand>, signal_rx: Receiver<Signal>) {
        let SessionInit {
            backend,
            mut audio_session,
            settings,
            state,
            bus,
            notifier,
            probe,
            signal_tx,
        } = init;

        configure_audio_session(audio_session.as_mut(), &settings.audio_session);

        let backend = match backend() {
            Ok(backend) => backend,
            Err(e) => {
                log::error!("Failed to initialize playback backend: {}", e);
                state.write().error = Some(e.to_string());
                Self::run_without_backend(&cmd_rx, notifier.as_ref());
                return;
            }
        };

        log::info!("Session thread started with {:?} backend", backend.kind());

        let mut thread = Self {
            backend,
            state,
            bus,
            notifier,
            probe,
            signal_tx,
            generation: 0,
            tick_interval: settings.playback.tick_interval(),
            last_tick: Instant::now(),
        };

        loop {
            let running = select! {
                recv(cmd_rx) -> msg => match msg {
                    Ok(SessionCommand::Shutdown) | Err(_) => false,
                    Ok(cmd) => {
                        thread.handle_command(cmd);
                        true
                    }
                },
                recv(signal_rx) -> msg => {
                    if let Ok(signal) = msg {
                        thread.handle_signal(signal);
                    }
                    true
                },
                default(thread.tick_interval) => true,
            };
            if !running {
                break;
            }

            if thread.last_tick.elapsed() >= thread.tick_interval {
                thread.tick();
            }
        }

        thread.backend.teardown();
        log::info!("Session thread shutting down");
    }

    /// Keep answering the handle after the backend failed to start: flushes
    /// return and every play request is reported as failed.
    fn run_without_backend(cmd_rx: &Receiver<SessionCommand>, notifier: &dyn Notifier) {
        for cmd in cmd_rx.iter() {
            match cmd {
                SessionCommand::Shutdown => break,
                SessionCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
                SessionCommand::PlayTrack(track) => {
                    log::error!("No playback backend, cannot play {}", track.id);
                    notifier.show_toast(PLAYBACK_FAILED, ToastKind::Error);
                }
                other => log::debug!("No playback backend, ignoring {:?}", other),
            }
        }
        log::info!("Session thread shutting down");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::PlayTrack(track) => self.play_track(track),
            SessionCommand::Pause => self.pause(),
            SessionCommand::Resume => {
                if let Err(e) = self.resume() {
                    log::warn!("Failed to resume playback, staying paused: {}", e);
                }
            }
            SessionCommand::TogglePlay => {
                if let Err(e) = self.toggle_play() {
                    log::warn!("Failed to resume playback, staying paused: {}", e);
                }
            }
            SessionCommand::Stop => self.stop(),
            SessionCommand::Seek(position_ms) => self.seek(position_ms),
            SessionCommand::AddToQueue(track) => {
                self.state.write().queue.push(track);
                self.emit_state();
            }
            SessionCommand::ClearQueue => {
                self.state.write().queue.clear();
                self.emit_state();
            }
            SessionCommand::Flush(ack) => {
                let _ = ack.send(());
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::ProbeFinished { generation, result } => {
                if generation != self.generation {
                    log::debug!("Ignoring probe result for superseded load #{}", generation);
                    return;
                }
                match result {
                    Ok(()) => self.start_backend(),
                    Err(e) => {
                        log::warn!("Audio source failed reachability check: {}", e);
                        self.fail(e);
                    }
                }
            }
            Signal::Backend { generation, event } => {
                if generation != self.generation {
                    log::trace!("Dropping {:?} from superseded load #{}", event, generation);
                    return;
                }
                self.handle_backend_event(event);
            }
        }
    }

    /// Periodic tick for backend polling (position, end detection)
    fn tick(&mut self) {
        self.last_tick = Instant::now();
        if self.backend.is_loaded() {
            self.backend.tick();
        }
    }

    fn play_track(&mut self, track: Track) {
        let current = self.state.read().phase.clone();
        if current.track().is_some_and(|loaded| loaded.same_as(&track)) {
            match current {
                PlaybackPhase::Playing { .. } => self.pause(),
                PlaybackPhase::Paused { .. } => {
                    if let Err(e) = self.resume() {
                        log::error!("Failed to resume playback: {}", e);
                        self.fail(e);
                    }
                }
                _ => log::debug!("Track {} is still loading, ignoring repeat request", track.id),
            }
            return;
        }

        self.retire_backend();
        let generation = self.generation;
        {
            let mut state = self.state.write();
            state.phase = PlaybackPhase::Loading {
                track: track.clone(),
            };
            state.error = None;
        }
        self.emit_state();

        if self.backend.kind().probes_before_load() {
            self.spawn_probe(generation, track.audio_url);
        } else {
            self.start_backend();
        }
    }

    fn spawn_probe(&mut self, generation: u64, url: String) {
        let probe = self.probe.clone();
        let signal_tx = self.signal_tx.clone();
        let spawned = thread::Builder::new()
            .name("cadenza-probe".into())
            .spawn(move || {
                let result = probe.check(&url);
                let _ = signal_tx.send(Signal::ProbeFinished { generation, result });
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn probe thread: {}", e);
            self.fail(PlaybackError::Network(e.to_string()));
        }
    }

    /// Load the track from the `Loading` phase into the backend and start it.
    fn start_backend(&mut self) {
        let track = match &self.state.read().phase {
            PlaybackPhase::Loading { track } => track.clone(),
            _ => return,
        };

        let events = BackendEvents::new(self.generation, self.signal_tx.clone());
        let started = self
            .backend
            .load(&track.audio_url, events)
            .and_then(|()| self.backend.play());

        match started {
            Ok(()) => {
                self.state.write().phase = PlaybackPhase::Playing {
                    duration_ms: track.duration_hint_ms(),
                    position_ms: 0,
                    track: track.clone(),
                };
                self.emit_state();
                events::emit_track_changed(&self.bus, &track);
                log::debug!("Playback started");
            }
            Err(e) => {
                log::error!("Failed to play track: {}", e);
                self.fail(e);
            }
        }
    }

    fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::DurationKnown(duration_ms) => {
                self.state.write().phase.set_duration_ms(duration_ms);
                self.emit_state();
            }
            BackendEvent::Position(position_ms) => {
                let updated = {
                    let mut state = self.state.write();
                    if state.phase.is_playing() {
                        state.phase.set_position_ms(position_ms);
                        true
                    } else {
                        false
                    }
                };
                if updated {
                    self.emit_state();
                }
            }
            BackendEvent::Finished => self.on_track_ended(),
            BackendEvent::Failed(reason) => {
                log::error!("Playback backend failed: {}", reason);
                self.fail(PlaybackError::Backend(reason));
            }
        }
    }

    /// Handle track ending naturally
    fn on_track_ended(&mut self) {
        let track_id = {
            let mut state = self.state.write();
            let track_id = match &state.phase {
                PlaybackPhase::Playing { track, .. } => track.id.clone(),
                _ => return,
            };
            // Keep the track so the mini-player can show what just finished.
            let phase = std::mem::take(&mut state.phase).into_paused();
            state.phase = phase;
            state.phase.set_position_ms(0);
            track_id
        };

        log::debug!("Track ended: {}", track_id);
        events::emit_track_ended(&self.bus, &track_id);
        self.emit_state();
    }

    fn pause(&mut self) {
        if !self.state.read().phase.is_playing() {
            return;
        }

        self.backend.pause();
        let exact_ms = self
            .backend
            .position()
            .map(|p| p.as_millis().min(u64::MAX as u128) as u64);
        let position_ms = {
            let mut state = self.state.write();
            let phase = std::mem::take(&mut state.phase).into_paused();
            state.phase = phase;
            // Ticks lag behind; take the backend's position at the pause.
            if let Some(exact_ms) = exact_ms {
                state.phase.set_position_ms(exact_ms);
            }
            state.phase.position_ms()
        };
        self.emit_state();
        log::debug!("Paused at {}ms", position_ms);
    }

    /// On a backend error the session stays paused; callers decide whether
    /// that is worth telling the user.
    fn resume(&mut self) -> Result<(), PlaybackError> {
        if !matches!(self.state.read().phase, PlaybackPhase::Paused { .. }) {
            return Ok(());
        }

        self.backend.play()?;

        {
            let mut state = self.state.write();
            let phase = std::mem::take(&mut state.phase).into_playing();
            state.phase = phase;
        }
        self.emit_state();
        log::debug!("Resumed");
        Ok(())
    }

    fn toggle_play(&mut self) -> Result<(), PlaybackError> {
        if self.state.read().phase.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.resume()
        }
    }

    fn stop(&mut self) {
        let idle = self.state.read().phase == PlaybackPhase::Idle;
        if idle && !self.backend.is_loaded() {
            return;
        }

        self.retire_backend();
        self.state.write().phase = PlaybackPhase::Idle;
        self.emit_state();
        log::debug!("Stopped");
    }

    fn seek(&mut self, position_ms: u64) {
        let duration_ms = {
            let state = self.state.read();
            match &state.phase {
                PlaybackPhase::Playing { duration_ms, .. }
                | PlaybackPhase::Paused { duration_ms, .. } => *duration_ms,
                _ => {
                    log::debug!("Nothing loaded, ignoring seek");
                    return;
                }
            }
        };
        let clamped = if duration_ms > 0 {
            position_ms.min(duration_ms)
        } else {
            position_ms
        };

        match self.backend.seek(Duration::from_millis(clamped)) {
            Ok(()) => log::debug!("Seeked to {}ms", clamped),
            Err(e) => log::warn!("Seek failed: {}", e),
        }

        self.state.write().phase.set_position_ms(clamped);
        self.emit_state();
    }

    /// Tear down the live backend resource and invalidate everything issued
    /// for it (pending probe, backend callbacks).
    fn retire_backend(&mut self) {
        self.backend.teardown();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Collapse any play-path failure to Idle and tell the user.
    fn fail(&mut self, error: PlaybackError) {
        self.retire_backend();
        {
            let mut state = self.state.write();
            state.phase = PlaybackPhase::Idle;
            state.error = Some(error.to_string());
        }
        self.emit_state();

        let message = if error.is_source_unavailable() {
            AUDIO_UNAVAILABLE
        } else {
            PLAYBACK_FAILED
        };
        self.notifier.show_toast(message, ToastKind::Error);
    }

    /// Emit current state to subscribers
    fn emit_state(&self) {
        let state = self.state.read();
        events::emit_state_update(&self.bus, &state);
    }
}

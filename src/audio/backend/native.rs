//! Long-lived player handle: one sink for the whole session, source replaced
//! per track.

use std::time::Duration;

use bytes::Bytes;
use rodio::Sink;

use super::output::{decode, total_duration_ms, OutputDevice, PositionTracker};
use super::{BackendEvent, BackendEvents, BackendKind, PlaybackBackend};
use crate::audio::error::{PlaybackError, Result};
use crate::audio::source::TrackSource;

pub struct NativeBackend {
    _device: OutputDevice,
    sink: Sink,
    client: reqwest::blocking::Client,
    position: PositionTracker,
    /// Encoded audio of the current track, kept to restart after it ends.
    loaded: Option<Bytes>,
    events: Option<BackendEvents>,
}

impl NativeBackend {
    pub fn new() -> Result<Self> {
        let device = OutputDevice::open()?;
        let sink = Sink::try_new(&device.handle)
            .map_err(|e| PlaybackError::Output(format!("Failed to create audio sink: {}", e)))?;
        sink.pause();

        Ok(Self {
            _device: device,
            sink,
            client: reqwest::blocking::Client::new(),
            position: PositionTracker::default(),
            loaded: None,
            events: None,
        })
    }

    fn append(&mut self, bytes: Bytes) -> Result<Option<u64>> {
        let decoder = decode(bytes)?;
        let duration_ms = total_duration_ms(&decoder);
        self.sink.stop();
        self.sink.append(decoder);
        Ok(duration_ms)
    }
}

impl PlaybackBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn load(&mut self, url: &str, events: BackendEvents) -> Result<()> {
        let bytes = TrackSource::from_url(url).fetch(&self.client)?;
        let duration_ms = self.append(bytes.clone())?;
        self.sink.pause();
        self.position.reset();
        self.loaded = Some(bytes);

        if let Some(duration_ms) = duration_ms {
            events.emit(BackendEvent::DurationKnown(duration_ms));
        }
        self.events = Some(events);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let Some(bytes) = self.loaded.clone() else {
            return Ok(());
        };
        if self.sink.empty() {
            // Finished earlier; start over from the top.
            self.append(bytes)?;
            self.position.reset();
        }
        self.sink.play();
        self.position.start();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
        self.position.pause();
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.position.seek(position);
        self.sink
            .try_seek(position)
            .map_err(|e| PlaybackError::Backend(format!("Seek failed: {}", e)))
    }

    fn teardown(&mut self) {
        self.sink.stop();
        self.sink.pause();
        self.position.reset();
        self.loaded = None;
        self.events = None;
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn position(&self) -> Option<Duration> {
        self.is_loaded().then(|| self.position.position())
    }

    fn tick(&mut self) {
        let Some(events) = &self.events else {
            return;
        };
        if !self.position.is_running() {
            return;
        }

        if self.sink.empty() {
            self.position.reset();
            events.emit(BackendEvent::Finished);
        } else {
            events.emit(BackendEvent::Position(self.position.position_ms()));
        }
    }
}

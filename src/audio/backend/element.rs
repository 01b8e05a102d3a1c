//! Media-element style backend: every track gets its own sink, started
//! straight from the URL while the download runs in the background.
//!
//! Failures are only noticed by the loader thread and reported as
//! [`BackendEvent::Failed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use rodio::Sink;

use super::output::{decode, total_duration_ms, OutputDevice, PositionTracker};
use super::{BackendEvent, BackendEvents, BackendKind, PlaybackBackend};
use crate::audio::error::{PlaybackError, Result};
use crate::audio::source::TrackSource;

/// One element per loaded track, dropped on teardown.
struct Element {
    sink: Arc<Sink>,
    /// Set by the loader once audio is queued on the sink.
    ready: Arc<AtomicBool>,
    /// Encoded audio, filled in by the loader.
    data: Arc<Mutex<Option<Bytes>>>,
    /// Tells the loader to abandon the download.
    cancelled: Arc<AtomicBool>,
    events: BackendEvents,
}

impl Element {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.sink.stop();
    }
}

pub struct MediaElementBackend {
    device: OutputDevice,
    client: reqwest::blocking::Client,
    element: Option<Element>,
    position: PositionTracker,
    wants_play: bool,
}

impl MediaElementBackend {
    pub fn new() -> Result<Self> {
        Ok(Self {
            device: OutputDevice::open()?,
            client: reqwest::blocking::Client::new(),
            element: None,
            position: PositionTracker::default(),
            wants_play: false,
        })
    }
}

impl PlaybackBackend for MediaElementBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MediaElement
    }

    fn load(&mut self, url: &str, events: BackendEvents) -> Result<()> {
        if let Some(previous) = self.element.take() {
            previous.cancel();
        }
        let sink = Sink::try_new(&self.device.handle)
            .map_err(|e| PlaybackError::Output(format!("Failed to create audio sink: {}", e)))?;
        let element = Element {
            sink: Arc::new(sink),
            ready: Arc::new(AtomicBool::new(false)),
            data: Arc::new(Mutex::new(None)),
            cancelled: Arc::new(AtomicBool::new(false)),
            events,
        };

        let source = TrackSource::from_url(url);
        let client = self.client.clone();
        let sink = element.sink.clone();
        let ready = element.ready.clone();
        let data = element.data.clone();
        let cancelled = element.cancelled.clone();
        let loader_events = element.events.clone();
        thread::Builder::new()
            .name("cadenza-element".into())
            .spawn(move || {
                let bytes = match source.fetch_unless(&client, &cancelled) {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => return,
                    Err(e) => {
                        loader_events.emit(BackendEvent::Failed(e.to_string()));
                        return;
                    }
                };
                match decode(bytes.clone()) {
                    Ok(decoder) => {
                        if cancelled.load(Ordering::SeqCst) {
                            return;
                        }
                        let duration_ms = total_duration_ms(&decoder);
                        sink.append(decoder);
                        *data.lock() = Some(bytes);
                        ready.store(true, Ordering::SeqCst);
                        if let Some(duration_ms) = duration_ms {
                            loader_events.emit(BackendEvent::DurationKnown(duration_ms));
                        }
                    }
                    Err(e) => {
                        loader_events.emit(BackendEvent::Failed(e.to_string()));
                    }
                }
            })
            .map_err(|e| PlaybackError::Backend(format!("Failed to spawn loader: {}", e)))?;

        self.position.reset();
        self.element = Some(element);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let Some(element) = &self.element else {
            return Ok(());
        };
        if element.ready.load(Ordering::SeqCst) && element.sink.empty() {
            // Ended earlier; like a media element, play() starts over.
            if let Some(bytes) = element.data.lock().clone() {
                element.sink.append(decode(bytes)?);
                self.position.reset();
            }
        }
        element.sink.play();
        self.wants_play = true;
        if element.ready.load(Ordering::SeqCst) {
            self.position.start();
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(element) = &self.element {
            element.sink.pause();
        }
        self.wants_play = false;
        self.position.pause();
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let Some(element) = &self.element else {
            return Ok(());
        };
        self.position.seek(position);
        element
            .sink
            .try_seek(position)
            .map_err(|e| PlaybackError::Backend(format!("Seek failed: {}", e)))
    }

    fn teardown(&mut self) {
        if let Some(element) = self.element.take() {
            element.cancel();
        }
        self.wants_play = false;
        self.position.reset();
    }

    fn is_loaded(&self) -> bool {
        self.element.is_some()
    }

    fn position(&self) -> Option<Duration> {
        self.element.as_ref().map(|_| self.position.position())
    }

    fn tick(&mut self) {
        let Some(element) = &self.element else {
            return;
        };
        if !element.ready.load(Ordering::SeqCst) {
            return;
        }
        if self.wants_play && !self.position.is_running() {
            // Audio arrived since play() was called.
            self.position.start();
        }
        if !self.position.is_running() {
            return;
        }

        if element.sink.empty() {
            self.wants_play = false;
            self.position.reset();
            element.events.emit(BackendEvent::Finished);
        } else {
            element
                .events
                .emit(BackendEvent::Position(self.position.position_ms()));
        }
    }
}

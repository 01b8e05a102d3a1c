//! Playback backends.
//!
//! A backend is the resource that actually decodes and plays audio. The
//! session thread owns exactly one and drives it through
//! [`PlaybackBackend`]. Two flavours exist:
//!
//! - [`BackendKind::MediaElement`]: a fresh element per track, started
//!   straight from the URL. Failures show up later as
//!   [`BackendEvent::Failed`].
//! - [`BackendKind::Native`]: one long-lived player handle whose source is
//!   replaced per track. The session probes the URL first.
//!
//! Backends report progress through [`BackendEvents`], which tags every
//! event with the load it belongs to so the session can drop events from a
//! resource it already tore down.

use std::time::Duration;

use crossbeam_channel::Sender;
use serde::Deserialize;

use crate::audio::engine::Signal;
use crate::audio::error::Result;

#[cfg(feature = "rodio-output")]
mod element;
#[cfg(feature = "rodio-output")]
mod native;
#[cfg(feature = "rodio-output")]
mod output;

#[cfg(feature = "rodio-output")]
pub use element::MediaElementBackend;
#[cfg(feature = "rodio-output")]
pub use native::NativeBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    MediaElement,
    #[default]
    Native,
}

impl BackendKind {
    /// Native loads are expensive to undo, so the URL is checked first.
    pub fn probes_before_load(self) -> bool {
        matches!(self, BackendKind::Native)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Authoritative duration, in milliseconds.
    DurationKnown(u64),
    /// Playback cursor, in milliseconds.
    Position(u64),
    /// Reached the end of the source.
    Finished,
    /// Playback failed after it was started.
    Failed(String),
}

/// Event sender handed to a backend on every load.
#[derive(Debug, Clone)]
pub struct BackendEvents {
    generation: u64,
    tx: Sender<Signal>,
}

impl BackendEvents {
    pub(crate) fn new(generation: u64, tx: Sender<Signal>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the session is gone.
    pub fn emit(&self, event: BackendEvent) -> bool {
        self.tx
            .send(Signal::Backend {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

pub trait PlaybackBackend {
    fn kind(&self) -> BackendKind;

    /// Attach `url` as the new source. The previous resource has already
    /// been torn down.
    fn load(&mut self, url: &str, events: BackendEvents) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Stop, rewind and detach the current source and its listeners.
    /// Must be safe to call when nothing is loaded.
    fn teardown(&mut self);

    fn is_loaded(&self) -> bool;

    /// Current playback position, if the backend can tell. Read when
    /// pausing, since position events only arrive once per tick.
    fn position(&self) -> Option<Duration> {
        None
    }

    /// Called periodically from the session thread.
    fn tick(&mut self) {}
}

/// Builds the backend on the session thread, since audio outputs are
/// usually tied to the thread that opened them.
pub type BackendFactory = Box<dyn FnOnce() -> Result<Box<dyn PlaybackBackend>> + Send>;

/// Factory for the rodio backend of the given kind.
#[cfg(feature = "rodio-output")]
pub fn default_backend_factory(kind: BackendKind) -> BackendFactory {
    Box::new(move || -> Result<Box<dyn PlaybackBackend>> {
        let backend: Box<dyn PlaybackBackend> = match kind {
            BackendKind::Native => Box::new(NativeBackend::new()?),
            BackendKind::MediaElement => Box::new(MediaElementBackend::new()?),
        };
        Ok(backend)
    })
}

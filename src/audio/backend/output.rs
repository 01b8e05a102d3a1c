//! Pieces shared by the rodio backends.

use std::io::Cursor;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Source};

use crate::audio::error::{PlaybackError, Result};

/// Default audio output. Not Send; lives on the session thread.
pub(super) struct OutputDevice {
    _stream: OutputStream,
    pub(super) handle: OutputStreamHandle,
}

impl OutputDevice {
    pub(super) fn open() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| PlaybackError::Output(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }
}

pub(super) fn decode(bytes: Bytes) -> Result<Decoder<Cursor<Bytes>>> {
    Decoder::new(Cursor::new(bytes)).map_err(|e| PlaybackError::Decode(e.to_string()))
}

pub(super) fn total_duration_ms(decoder: &Decoder<Cursor<Bytes>>) -> Option<u64> {
    decoder
        .total_duration()
        .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
}

/// Tracks playback position using wall-clock time.
///
/// Since Rodio doesn't expose the current playback position, we track it
/// by measuring elapsed time while playing.
#[derive(Debug, Default)]
pub(super) struct PositionTracker {
    /// When playback started (or resumed)
    play_start: Option<Instant>,
    /// Accumulated position from previous play segments
    accumulated: Duration,
}

impl PositionTracker {
    pub(super) fn start(&mut self) {
        if self.play_start.is_none() {
            self.play_start = Some(Instant::now());
        }
    }

    pub(super) fn pause(&mut self) {
        if let Some(start) = self.play_start.take() {
            self.accumulated += start.elapsed();
        }
    }

    pub(super) fn reset(&mut self) {
        self.play_start = None;
        self.accumulated = Duration::ZERO;
    }

    pub(super) fn seek(&mut self, position: Duration) {
        self.accumulated = position;
        if self.play_start.is_some() {
            self.play_start = Some(Instant::now());
        }
    }

    pub(super) fn position(&self) -> Duration {
        self.accumulated + self.play_start.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub(super) fn position_ms(&self) -> u64 {
        self.position().as_millis().min(u64::MAX as u128) as u64
    }

    pub(super) fn is_running(&self) -> bool {
        self.play_start.is_some()
    }
}

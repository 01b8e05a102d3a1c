//! Host audio-session configuration (audio category, background playback).

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AudioSessionOptions {
    /// Keep playing when the device's silent switch is on.
    pub plays_in_silent_mode: bool,
    /// Keep the session alive while the app is backgrounded.
    pub stays_active_in_background: bool,
}

impl Default for AudioSessionOptions {
    fn default() -> Self {
        Self {
            plays_in_silent_mode: true,
            stays_active_in_background: true,
        }
    }
}

/// Platform hook called once when the session thread starts.
pub trait AudioSessionConfigurator: Send {
    fn is_supported(&self) -> bool {
        true
    }

    /// Apply the options. Returns `false` when the platform refused them.
    fn configure(&mut self, options: &AudioSessionOptions) -> bool;
}

/// Used on hosts without an audio-session concept (desktop, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudioSession;

impl AudioSessionConfigurator for NoopAudioSession {
    fn is_supported(&self) -> bool {
        false
    }

    fn configure(&mut self, _options: &AudioSessionOptions) -> bool {
        true
    }
}

/// Best-effort configuration; a refusal is logged and otherwise ignored.
pub(crate) fn configure_audio_session(
    configurator: &mut dyn AudioSessionConfigurator,
    options: &AudioSessionOptions,
) {
    if !configurator.is_supported() {
        log::debug!("Audio session configuration not supported on this platform");
        return;
    }

    if configurator.configure(options) {
        log::debug!("Audio session configured: {:?}", options);
    } else {
        log::warn!("Failed to configure audio session, continuing with platform defaults");
    }
}

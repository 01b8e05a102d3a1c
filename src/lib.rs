pub mod audio;
pub mod config;
mod logging;

pub use audio::backend::{BackendEvent, BackendEvents, BackendFactory, BackendKind, PlaybackBackend};
pub use audio::error::PlaybackError;
pub use audio::events::SessionEvent;
pub use audio::notify::{Notifier, ToastKind};
pub use audio::probe::ReachabilityProbe;
pub use audio::state::{PlaybackSnapshot, PlaybackStatus, Track};
pub use audio::{PlaybackSession, SessionBuilder};
pub use config::Settings;
pub use logging::init_logging;

/// Load settings, install logging and start a session on the configured
/// audio output.
#[cfg(feature = "rodio-output")]
pub fn start() -> Result<PlaybackSession, PlaybackError> {
    let (settings, problem) = match config::try_load_settings() {
        Ok(settings) => (settings, None),
        Err(msg) => (Settings::default(), Some(msg)),
    };
    if cfg!(debug_assertions) && !init_logging(&settings.logging) {
        log::debug!("Log subscriber already installed by host");
    }
    // Only reported now that a subscriber is listening.
    if let Some(msg) = problem {
        log::warn!("{}, using defaults", msg);
    }
    PlaybackSession::with_output(settings)
}

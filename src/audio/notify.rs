//! User-visible notifications raised by the session.

use serde::Serialize;

/// Shown when the source can't be reached or the backend gives up on it.
pub const AUDIO_UNAVAILABLE: &str = "Audio unavailable. Try another sample.";
/// Shown for every other failure in the play path.
pub const PLAYBACK_FAILED: &str = "Unable to play audio. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Error,
    Info,
    Success,
}

/// Fire-and-forget toast sink provided by the host UI.
pub trait Notifier: Send + Sync {
    fn show_toast(&self, message: &str, kind: ToastKind);
}

impl<F> Notifier for F
where
    F: Fn(&str, ToastKind) + Send + Sync,
{
    fn show_toast(&self, message: &str, kind: ToastKind) {
        self(message, kind)
    }
}

/// Default sink when no UI is attached: the toast only reaches the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_toast(&self, message: &str, kind: ToastKind) {
        match kind {
            ToastKind::Error => log::warn!("Toast: {}", message),
            ToastKind::Info | ToastKind::Success => log::info!("Toast: {}", message),
        }
    }
}

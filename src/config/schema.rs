use std::time::Duration;

use serde::Deserialize;

use crate::audio::backend::BackendKind;
use crate::audio::platform::AudioSessionOptions;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path: `<config dir>/cadenza/config.toml` (see [`dirs::config_dir`])
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `CADENZA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub probe: ProbeSettings,
    pub audio_session: AudioSessionOptions,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// `native` (probe first, long-lived player) or `media-element`
    /// (fresh element per track, no probe).
    pub backend: BackendKind,
    /// How often the backend is polled for position and end of track.
    pub tick_interval_ms: u64,
    /// Commands that may queue up before callers block.
    pub command_capacity: usize,
}

impl PlaybackSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            tick_interval_ms: 250,
            command_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Upper bound for the whole HEAD request. A probe that runs longer
    /// counts as unreachable.
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            user_agent: concat!("Cadenza/", env!("CARGO_PKG_VERSION")).to_string(),
            use_system_proxy: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level for this crate when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

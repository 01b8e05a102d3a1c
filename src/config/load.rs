use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then lets environment
/// variables (prefix `CADENZA__`) override it, and falls back to struct
/// defaults for anything unset.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("CADENZA")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.playback.tick_interval_ms == 0 {
            return Err("playback.tick_interval_ms must be >= 1".to_string());
        }
        if self.playback.command_capacity == 0 {
            return Err("playback.command_capacity must be >= 1".to_string());
        }
        if self.probe.timeout_ms == 0 {
            return Err("probe.timeout_ms must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Load and validate settings, describing what went wrong otherwise.
pub fn try_load_settings() -> Result<Settings, String> {
    let settings = Settings::load().map_err(|e| format!("Failed to load config: {}", e))?;
    settings
        .validate()
        .map_err(|msg| format!("Invalid config: {}", msg))?;
    Ok(settings)
}

/// Load settings, falling back to defaults when the file is broken or
/// invalid. Configuration is optional and never stops the app from starting.
pub fn load_settings() -> Settings {
    try_load_settings().unwrap_or_else(|msg| {
        log::warn!("{}, using defaults", msg);
        Settings::default()
    })
}

/// Resolve the config path from `CADENZA_CONFIG_PATH` or the platform default.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("CADENZA_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `<config dir>/cadenza/config.toml`, e.g. `~/.config/cadenza/config.toml`
/// on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cadenza").join("config.toml"))
}

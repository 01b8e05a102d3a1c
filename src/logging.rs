use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the global log subscriber.
///
/// `RUST_LOG` wins when set; otherwise this crate logs at the configured
/// level and everything else at `warn`. Records from the `log` facade are
/// bridged into the subscriber. Returns `false` if a subscriber was already
/// installed by the host.
pub fn init_logging(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,cadenza_lib={}", settings.level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

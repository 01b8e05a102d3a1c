//! Reachability probe run before committing the native backend to a URL.

use std::time::Duration;

use crate::audio::error::{PlaybackError, Result};
use crate::audio::source::TrackSource;
use crate::config::ProbeSettings;

/// Cheap check that a track's audio can be fetched at all.
///
/// Called from a probe thread, so implementations may block.
pub trait ReachabilityProbe: Send + Sync {
    fn check(&self, url: &str) -> Result<()>;
}

/// Sends a HEAD request for remote sources and checks local ones exist.
///
/// Any non-2xx status or transport failure counts as unreachable; a request
/// that outlives the configured timeout is reported as
/// [`PlaybackError::ProbeTimeout`].
pub struct HttpProbe {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(settings: &ProbeSettings) -> Result<Self> {
        let timeout = settings.timeout();
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(settings.user_agent.clone());
        if !settings.use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| PlaybackError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    fn check_remote(&self, url: &str) -> Result<()> {
        let response = self.client.head(url).send().map_err(|e| {
            if e.is_timeout() {
                PlaybackError::ProbeTimeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                PlaybackError::Unreachable {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PlaybackError::Unreachable {
                url: url.to_string(),
                reason: status.to_string(),
            })
        }
    }
}

impl ReachabilityProbe for HttpProbe {
    fn check(&self, url: &str) -> Result<()> {
        match TrackSource::from_url(url) {
            TrackSource::HttpStream { url } => self.check_remote(&url),
            TrackSource::LocalFile { path } => {
                if path.is_file() {
                    Ok(())
                } else {
                    Err(PlaybackError::Unreachable {
                        url: url.to_string(),
                        reason: "no such file".into(),
                    })
                }
            }
        }
    }
}

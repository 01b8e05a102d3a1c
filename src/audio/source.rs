//! Where a track's audio comes from.

use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};

use crate::audio::error::{PlaybackError, Result};

const CHUNK_SIZE: usize = 64 * 1024;
/// Upper bound for trusting `Content-Length` when preallocating.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Represents the source of an audio track.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSource {
    /// HTTP/HTTPS stream (sample CDN, remote archive)
    HttpStream { url: String },
    /// Bundled or downloaded file on disk
    LocalFile { path: PathBuf },
}

impl TrackSource {
    /// Parse a URL string into the appropriate source type.
    ///
    /// HTTP/HTTPS URLs become `HttpStream`, `file://` URLs and everything else
    /// are treated as local paths.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            TrackSource::HttpStream {
                url: url.to_string(),
            }
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            TrackSource::LocalFile { path: path.into() }
        }
    }

    /// Read the whole encoded stream into memory.
    pub fn fetch(&self, client: &reqwest::blocking::Client) -> Result<Bytes> {
        let never = AtomicBool::new(false);
        self.fetch_unless(client, &never).map(Option::unwrap_or_default)
    }

    /// Like [`fetch`](Self::fetch), but gives up between chunks once
    /// `cancelled` is set. Returns `None` in that case.
    pub fn fetch_unless(
        &self,
        client: &reqwest::blocking::Client,
        cancelled: &AtomicBool,
    ) -> Result<Option<Bytes>> {
        match self {
            TrackSource::HttpStream { url } => {
                log::debug!("Loading HTTP stream: {}", url);

                let mut response = client
                    .get(url)
                    .send()
                    .map_err(|e| PlaybackError::Network(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(PlaybackError::Network(format!(
                        "Server error: {}",
                        response.status()
                    )));
                }

                let hint = response.content_length().unwrap_or(0).min(MAX_PREALLOC);
                let mut body = BytesMut::with_capacity(hint as usize);
                let mut chunk = vec![0u8; CHUNK_SIZE];
                loop {
                    if cancelled.load(Ordering::SeqCst) {
                        log::debug!("Download cancelled after {} bytes: {}", body.len(), url);
                        return Ok(None);
                    }
                    let n = response
                        .read(&mut chunk)
                        .map_err(|e| PlaybackError::Network(format!("Failed to download: {}", e)))?;
                    if n == 0 {
                        break;
                    }
                    body.extend_from_slice(&chunk[..n]);
                }

                log::debug!("Downloaded {} bytes", body.len());
                Ok(Some(body.freeze()))
            }
            TrackSource::LocalFile { path } => {
                if cancelled.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                log::debug!("Loading local file: {}", path.display());

                let data = std::fs::read(path).map_err(|e| {
                    PlaybackError::Unreachable {
                        url: path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(Bytes::from(data)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// Serves one response: headers announcing `announced` bytes, then
    /// `body`, then holds the connection open for a while.
    fn serve_body(announced: usize, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let head = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                    announced
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(body);
                let _ = stream.flush();
                thread::sleep(Duration::from_secs(3));
            }
        });
        format!("http://{}/sample.mp3", addr)
    }

    #[test]
    fn http_urls_are_streams() {
        assert_eq!(
            TrackSource::from_url("https://cdn.example/bach.mp3"),
            TrackSource::HttpStream {
                url: "https://cdn.example/bach.mp3".into()
            }
        );
        assert!(matches!(
            TrackSource::from_url("http://10.0.0.2/x.ogg"),
            TrackSource::HttpStream { .. }
        ));
    }

    #[test]
    fn file_urls_and_bare_paths_are_local() {
        assert_eq!(
            TrackSource::from_url("file:///data/samples/bach.mp3"),
            TrackSource::LocalFile {
                path: PathBuf::from("/data/samples/bach.mp3")
            }
        );
        assert_eq!(
            TrackSource::from_url("samples/bach.mp3"),
            TrackSource::LocalFile {
                path: PathBuf::from("samples/bach.mp3")
            }
        );
    }

    #[test]
    fn fetches_local_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ID3fake").unwrap();

        let source = TrackSource::LocalFile {
            path: file.path().to_path_buf(),
        };
        let client = reqwest::blocking::Client::new();
        assert_eq!(source.fetch(&client).unwrap(), Bytes::from_static(b"ID3fake"));
    }

    #[test]
    fn missing_local_file_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let source = TrackSource::LocalFile {
            path: dir.path().join("missing.mp3"),
        };
        let client = reqwest::blocking::Client::new();
        assert!(matches!(
            source.fetch(&client),
            Err(PlaybackError::Unreachable { .. })
        ));
    }

    #[test]
    fn downloads_whole_http_body() {
        let url = serve_body(7, b"ID3fake");
        let client = reqwest::blocking::Client::new();
        let source = TrackSource::from_url(&url);
        assert_eq!(source.fetch(&client).unwrap(), Bytes::from_static(b"ID3fake"));
    }

    #[test]
    fn cancelled_download_stops_without_reading_the_rest() {
        // Announces far more than it sends, so only cancellation can end
        // the download quickly.
        let url = serve_body(10_000_000, b"ID3partial");
        let client = reqwest::blocking::Client::new();
        let cancelled = AtomicBool::new(true);

        let started = std::time::Instant::now();
        let result = TrackSource::from_url(&url)
            .fetch_unless(&client, &cancelled)
            .unwrap();
        assert_eq!(result, None);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn cancelled_local_read_returns_nothing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = TrackSource::LocalFile {
            path: file.path().to_path_buf(),
        };
        let client = reqwest::blocking::Client::new();
        let cancelled = AtomicBool::new(true);
        assert_eq!(source.fetch_unless(&client, &cancelled).unwrap(), None);
    }
}

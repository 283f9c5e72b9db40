//! WebDAV client for the notes directory.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use groundwave_core::defaults::SLOW_REQUEST_THRESHOLD_MS;
use groundwave_core::{Error, RemoteDirectory, RemoteEntry, Result, ZkConfig};

use crate::propfind::{parse_multistatus, PROPFIND_BODY};

/// HTTP client for PROPFIND listings and GET of note bodies.
///
/// One `reqwest::Client` is kept for the lifetime of the value so connections
/// are pooled across a build.
#[derive(Clone)]
pub struct WebDavClient {
    client: Client,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl WebDavClient {
    /// Create a client from configuration.
    pub fn new(config: &ZkConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "webdav",
            notes_root = %config.notes_root(),
            authenticated = config.credentials().is_some(),
            timeout_ms = config.request_timeout.as_millis() as u64,
            "Initializing WebDAV client"
        );

        Ok(Self {
            client,
            credentials: config
                .credentials()
                .map(|(u, p)| (u.to_string(), p.to_string())),
            timeout: config.request_timeout,
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url).timeout(self.timeout);
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    /// List a directory with a depth-1 PROPFIND.
    ///
    /// A 404 yields an empty listing. The collection's own entry is dropped.
    #[instrument(skip(self, cancel), fields(subsystem = "webdav", component = "client", op = "propfind"))]
    pub async fn propfind(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<RemoteEntry>> {
        let start = Instant::now();
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| Error::Internal(format!("Invalid PROPFIND method: {}", e)))?;

        let request = self
            .request(method, url)
            .header("Depth", "1")
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            )
            .body(PROPFIND_BODY);

        let response = cancellable(cancel, "PROPFIND", url, async {
            request
                .send()
                .await
                .map_err(|e| Error::Request(format!("PROPFIND {} failed: {}", url, e)))
        })
        .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url, "Directory not found, treating as empty");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = cancellable(cancel, "PROPFIND", url, async {
            response
                .text()
                .await
                .map_err(|e| Error::Request(format!("Failed to read listing {}: {}", url, e)))
        })
        .await?;

        let entries = parse_multistatus(&body, url)?;
        log_elapsed("propfind", url, start, entries.len());
        Ok(entries)
    }

    /// Fetch a file body. Any status other than 200 is an error.
    #[instrument(skip(self, cancel), fields(subsystem = "webdav", component = "client", op = "fetch"))]
    pub async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let start = Instant::now();
        let request = self.request(Method::GET, url);

        let response = cancellable(cancel, "GET", url, async {
            request
                .send()
                .await
                .map_err(|e| Error::Request(format!("GET {} failed: {}", url, e)))
        })
        .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = cancellable(cancel, "GET", url, async {
            response
                .bytes()
                .await
                .map_err(|e| Error::Request(format!("Failed to read body {}: {}", url, e)))
        })
        .await?;

        log_elapsed("fetch", url, start, bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RemoteDirectory for WebDavClient {
    async fn list_directory(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RemoteEntry>> {
        self.propfind(url, cancel).await
    }

    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.get(url, cancel).await
    }
}

/// Race a request future against cancellation.
async fn cancellable<T, F>(cancel: &CancellationToken, verb: &str, url: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled(format!("{} {}", verb, url))),
        result = fut => result,
    }
}

fn log_elapsed(op: &str, url: &str, start: Instant, size: usize) {
    let elapsed = start.elapsed().as_millis() as u64;
    debug!(op, url, result_count = size, duration_ms = elapsed, "Request complete");
    if elapsed > SLOW_REQUEST_THRESHOLD_MS {
        warn!(op, url, duration_ms = elapsed, slow = true, "Slow WebDAV request");
    }
}

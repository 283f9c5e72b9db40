//! Zettelkasten location and policy configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::defaults;
use crate::{Error, Result};

/// Where the notes live and how the cache talks to them.
///
/// The index note URL (`zk_path`) determines everything else: its directory
/// is the notes root, and daily notes live in `{notes_root}daily/`.
#[derive(Clone)]
pub struct ZkConfig {
    notes_root: Url,
    index_filename: String,
    home_filename: Option<String>,
    username: Option<String>,
    password: Option<String>,
    /// Timeout applied to each WebDAV request.
    pub request_timeout: Duration,
    /// Sleep between background refresh cycles.
    pub refresh_interval: Duration,
    /// Delay before the first background refresh.
    pub startup_delay: Duration,
    /// Upper bound for one background refresh cycle.
    pub refresh_deadline: Duration,
    /// Note bodies fetched concurrently during a build.
    pub fetch_concurrency: usize,
}

impl ZkConfig {
    /// Create a config from the URL of the index note.
    pub fn new(zk_path: &str) -> Result<Self> {
        let (notes_root, index_filename) = split_note_url(zk_path, "zk_path")?;
        Ok(Self {
            notes_root,
            index_filename,
            home_filename: None,
            username: None,
            password: None,
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            refresh_interval: Duration::from_secs(defaults::REFRESH_INTERVAL_SECS),
            startup_delay: Duration::from_secs(defaults::STARTUP_DELAY_SECS),
            refresh_deadline: Duration::from_secs(defaults::REFRESH_DEADLINE_SECS),
            fetch_concurrency: defaults::FETCH_CONCURRENCY,
        })
    }

    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ZK_PATH` | required | URL of the index note |
    /// | `HOME_PATH` | unset | URL of the home note, same directory as `ZK_PATH` |
    /// | `WEBDAV_USERNAME` | unset | Basic auth user |
    /// | `WEBDAV_PASSWORD` | unset | Basic auth password |
    /// | `ZK_REQUEST_TIMEOUT_SECS` | `3` | Per-request timeout |
    /// | `ZK_REFRESH_INTERVAL_SECS` | `600` | Background refresh interval |
    /// | `ZK_STARTUP_DELAY_SECS` | `5` | Delay before first refresh |
    /// | `ZK_REFRESH_DEADLINE_SECS` | `900` | Upper bound for one refresh |
    /// | `ZK_FETCH_CONCURRENCY` | `4` | Concurrent body fetches per build |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: u64| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let zk_path = get("ZK_PATH").ok_or_else(|| Error::Config("ZK_PATH is not set".into()))?;
        let mut config = Self::new(&zk_path)?;

        if let Some(home) = get("HOME_PATH") {
            config = config.with_home_path(&home)?;
        }
        if let (Some(user), Some(pass)) = (get("WEBDAV_USERNAME"), get("WEBDAV_PASSWORD")) {
            config = config.with_credentials(user, pass);
        }

        config.request_timeout = Duration::from_secs(secs(
            "ZK_REQUEST_TIMEOUT_SECS",
            defaults::REQUEST_TIMEOUT_SECS,
        ));
        config.refresh_interval = Duration::from_secs(secs(
            "ZK_REFRESH_INTERVAL_SECS",
            defaults::REFRESH_INTERVAL_SECS,
        ));
        config.startup_delay = Duration::from_secs(secs(
            "ZK_STARTUP_DELAY_SECS",
            defaults::STARTUP_DELAY_SECS,
        ));
        config.refresh_deadline = Duration::from_secs(secs(
            "ZK_REFRESH_DEADLINE_SECS",
            defaults::REFRESH_DEADLINE_SECS,
        ));
        config.fetch_concurrency = get("ZK_FETCH_CONCURRENCY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults::FETCH_CONCURRENCY)
            .max(1);

        Ok(config)
    }

    /// Set the home note. It must live in the same directory as the index.
    pub fn with_home_path(mut self, home_path: &str) -> Result<Self> {
        let (root, filename) = split_note_url(home_path, "home_path")?;
        if root != self.notes_root {
            return Err(Error::Config(format!(
                "home_path directory {} differs from zk_path directory {}",
                root, self.notes_root
            )));
        }
        self.home_filename = Some(filename);
        Ok(self)
    }

    /// Set Basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the background refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the delay before the first background refresh.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Set the upper bound for one refresh cycle.
    pub fn with_refresh_deadline(mut self, deadline: Duration) -> Self {
        self.refresh_deadline = deadline;
        self
    }

    /// Set the number of concurrent body fetches per build.
    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    /// Notes directory URL, always ending in `/`.
    pub fn notes_root(&self) -> &str {
        self.notes_root.as_str()
    }

    /// Daily notes directory URL, always ending in `/`.
    pub fn daily_dir(&self) -> String {
        format!("{}{}/", self.notes_root, defaults::DAILY_SUBDIR)
    }

    pub fn index_filename(&self) -> &str {
        &self.index_filename
    }

    pub fn home_filename(&self) -> Option<&str> {
        self.home_filename.as_deref()
    }

    /// URL of a file in the notes directory.
    pub fn file_url(&self, filename: &str) -> String {
        format!("{}{}", self.notes_root, urlencoding::encode(filename))
    }

    /// URL of a file in the daily directory.
    pub fn daily_file_url(&self, filename: &str) -> String {
        format!("{}{}", self.daily_dir(), urlencoding::encode(filename))
    }

    /// Basic auth credentials, only when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for ZkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZkConfig")
            .field("notes_root", &self.notes_root.as_str())
            .field("index_filename", &self.index_filename)
            .field("home_filename", &self.home_filename)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("refresh_interval", &self.refresh_interval)
            .field("startup_delay", &self.startup_delay)
            .field("refresh_deadline", &self.refresh_deadline)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .finish()
    }
}

/// Split a note URL into its directory (ending in `/`) and decoded filename.
fn split_note_url(raw: &str, key: &str) -> Result<(Url, String)> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", key, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "{} must be an http(s) URL, got scheme {}",
            key,
            url.scheme()
        )));
    }

    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .to_string();
    let filename = urlencoding::decode(&last)
        .map_err(|e| Error::Config(format!("{} has an undecodable filename: {}", key, e)))?
        .into_owned();
    if filename.len() <= ".org".len() || !filename.ends_with(".org") {
        return Err(Error::Config(format!("{} must point to an .org file", key)));
    }

    let mut root = url.clone();
    root.set_query(None);
    root.set_fragment(None);
    root.path_segments_mut()
        .map_err(|_| Error::Config(format!("{} cannot be a base URL", key)))?
        .pop()
        .push("");

    Ok((root, filename))
}

//! In-memory note directory for tests and offline runs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use groundwave_zk::test_fixtures::{note_body, MemoryDirectory};
//!
//! let config = ZkConfig::new("https://host/zk/index.org")?;
//! let dir = MemoryDirectory::new(&config);
//! dir.add_note("a.org", &note_body(A_ID, "A", "links [[id:...]]"));
//! dir.add_daily("2024-01-01.org", "Walked.");
//! let cache = ZkCache::new(Arc::new(dir.clone()), config);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use groundwave_core::{Error, RemoteDirectory, RemoteEntry, Result, ZkConfig};

/// A recorded call against a [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCall {
    List(String),
    Fetch(String),
}

#[derive(Debug, Default)]
struct State {
    /// Directory URL -> ordered member names.
    listings: HashMap<String, Vec<RemoteEntry>>,
    /// File URL -> body.
    files: HashMap<String, Vec<u8>>,
    failing_fetches: HashSet<String>,
    failing_listings: HashSet<String>,
    calls: Vec<MemoryCall>,
}

/// Shared, cloneable in-memory [`RemoteDirectory`].
///
/// Listings keep insertion order. Directories that were never populated list
/// as empty, the way a missing WebDAV collection does.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    config: ZkConfig,
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
}

impl MemoryDirectory {
    pub fn new(config: &ZkConfig) -> Self {
        Self {
            config: config.clone(),
            state: Arc::new(Mutex::new(State::default())),
            latency: None,
        }
    }

    /// Delay every call by `latency` (cancellable).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put(&self, dir_url: String, file_url: String, name: &str, body: &str, modified: Option<DateTime<Utc>>) {
        let path = url::Url::parse(&file_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| file_url.clone());
        let entry = RemoteEntry {
            path,
            name: name.to_string(),
            is_dir: false,
            size: Some(body.len() as u64),
            modified,
        };
        let mut state = self.lock();
        let listing = state.listings.entry(dir_url).or_default();
        listing.retain(|e| e.name != name);
        listing.push(entry);
        state.files.insert(file_url, body.as_bytes().to_vec());
    }

    /// Add or replace a file in the notes directory.
    pub fn add_note(&self, filename: &str, body: &str) {
        self.put(
            self.config.notes_root().to_string(),
            self.config.file_url(filename),
            filename,
            body,
            None,
        );
    }

    /// Add or replace a file in the daily directory.
    pub fn add_daily(&self, filename: &str, body: &str) {
        self.add_daily_modified(filename, body, None);
    }

    /// Add a daily file with a last-modified time.
    pub fn add_daily_modified(&self, filename: &str, body: &str, modified: Option<DateTime<Utc>>) {
        self.put(
            self.config.daily_dir(),
            self.config.daily_file_url(filename),
            filename,
            body,
            modified,
        );
    }

    /// Add a subdirectory entry to the notes directory listing.
    pub fn add_subdirectory(&self, name: &str) {
        let mut state = self.lock();
        let root = self.config.notes_root().to_string();
        state.listings.entry(root).or_default().push(RemoteEntry {
            path: format!("/{}/", name),
            name: name.to_string(),
            is_dir: true,
            size: None,
            modified: None,
        });
    }

    /// Remove a file from the notes directory.
    pub fn remove_note(&self, filename: &str) {
        let mut state = self.lock();
        let root = self.config.notes_root().to_string();
        if let Some(listing) = state.listings.get_mut(&root) {
            listing.retain(|e| e.name != filename);
        }
        state.files.remove(&self.config.file_url(filename));
    }

    /// Make fetches of a notes-directory file fail with a 500.
    pub fn fail_fetch(&self, filename: &str) {
        let url = self.config.file_url(filename);
        self.lock().failing_fetches.insert(url);
    }

    /// Make listings of a directory URL fail with a 500.
    pub fn fail_listing(&self, dir_url: &str) {
        self.lock().failing_listings.insert(dir_url.to_string());
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<MemoryCall> {
        self.lock().calls.clone()
    }

    pub fn list_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MemoryCall::List(_)))
            .count()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MemoryCall::Fetch(_)))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    async fn wait(&self, what: &str, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(what.to_string()));
        }
        if let Some(latency) = self.latency {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled(what.to_string())),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteDirectory for MemoryDirectory {
    async fn list_directory(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RemoteEntry>> {
        self.lock().calls.push(MemoryCall::List(url.to_string()));
        self.wait(url, cancel).await?;
        let state = self.lock();
        if state.failing_listings.contains(url) {
            return Err(Error::RemoteStatus {
                status: 500,
                url: url.to_string(),
            });
        }
        Ok(state.listings.get(url).cloned().unwrap_or_default())
    }

    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.lock().calls.push(MemoryCall::Fetch(url.to_string()));
        self.wait(url, cancel).await?;
        let state = self.lock();
        if state.failing_fetches.contains(url) {
            return Err(Error::RemoteStatus {
                status: 500,
                url: url.to_string(),
            });
        }
        state.files.get(url).cloned().ok_or_else(|| Error::RemoteStatus {
            status: 404,
            url: url.to_string(),
        })
    }
}

/// Org body with a property drawer, a title and free text.
pub fn note_body(id: &str, title: &str, text: &str) -> String {
    format!(
        ":PROPERTIES:\n:ID:       {}\n:END:\n#+TITLE: {}\n\n{}\n",
        id, title, text
    )
}

/// Like [`note_body`] with `#+access: public`.
pub fn public_note_body(id: &str, title: &str, text: &str) -> String {
    format!(
        ":PROPERTIES:\n:ID:       {}\n:END:\n#+TITLE: {}\n#+access: public\n\n{}\n",
        id, title, text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ZkConfig {
        ZkConfig::new("https://host/zk/index.org").unwrap()
    }

    #[tokio::test]
    async fn test_listing_and_fetch() {
        let config = config();
        let dir = MemoryDirectory::new(&config);
        dir.add_note("a.org", "body");
        let cancel = CancellationToken::new();

        let entries = dir.list_directory(config.notes_root(), &cancel).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.org");
        assert_eq!(entries[0].path, "/zk/a.org");

        let body = dir.fetch(&config.file_url("a.org"), &cancel).await.unwrap();
        assert_eq!(body, b"body");
        assert_eq!(dir.list_count(), 1);
        assert_eq!(dir.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_daily_lists_empty() {
        let config = config();
        let dir = MemoryDirectory::new(&config);
        let entries = dir
            .list_directory(&config.daily_dir(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_failures_and_missing_files() {
        let config = config();
        let dir = MemoryDirectory::new(&config);
        dir.add_note("a.org", "body");
        dir.fail_fetch("a.org");
        let cancel = CancellationToken::new();

        let err = dir.fetch(&config.file_url("a.org"), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::RemoteStatus { status: 500, .. }));
        let err = dir.fetch(&config.file_url("nope.org"), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::RemoteStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_replace_keeps_single_entry() {
        let config = config();
        let dir = MemoryDirectory::new(&config);
        dir.add_note("a.org", "v1");
        dir.add_note("a.org", "v2");
        let cancel = CancellationToken::new();
        let entries = dir.list_directory(config.notes_root(), &cancel).await.unwrap();
        assert_eq!(entries.len(), 1);
        let body = dir.fetch(&config.file_url("a.org"), &cancel).await.unwrap();
        assert_eq!(body, b"v2");
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let config = config();
        let dir = MemoryDirectory::new(&config);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = dir
            .list_directory(config.notes_root(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }
}

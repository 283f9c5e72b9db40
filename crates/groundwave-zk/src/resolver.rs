//! Note id to filename resolution.
//!
//! ## Resolution Order
//!
//! 1. Validate the id (no network on failure)
//! 2. Map lookup
//! 3. List the notes directory and fetch `.org` files in listing order,
//!    recording every `(id, filename)` pair seen, until one matches
//!
//! A terminal miss is not cached, so notes added later are found by the
//! next call. Entries are never evicted; a stale entry is overwritten the
//! next time a scan reads the file that now holds the id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use groundwave_core::{parse_note_id, Error, RemoteDirectory, Result, ZkConfig};

use crate::org::{decode_body, extract_id};

/// Lazy, write-through map from note id to filename.
#[derive(Clone)]
pub struct IdResolver {
    source: Arc<dyn RemoteDirectory>,
    config: ZkConfig,
    map: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl IdResolver {
    pub fn new(source: Arc<dyn RemoteDirectory>, config: ZkConfig) -> Self {
        Self {
            source,
            config,
            map: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve `id` to the filename holding it.
    #[instrument(skip(self, cancel), fields(subsystem = "zk", component = "resolver", op = "resolve"))]
    pub async fn resolve(&self, id: &str, cancel: &CancellationToken) -> Result<String> {
        let uuid = parse_note_id(id)?;

        if let Some(filename) = self.cached(&uuid).await {
            debug!(note_id = %uuid, filename = %filename, "Resolver hit");
            return Ok(filename);
        }

        debug!(note_id = %uuid, "Resolver miss, scanning notes directory");
        self.scan_for(uuid, cancel).await
    }

    async fn scan_for(&self, wanted: Uuid, cancel: &CancellationToken) -> Result<String> {
        let listing = self
            .source
            .list_directory(self.config.notes_root(), cancel)
            .await?;

        for entry in listing.iter().filter(|e| e.is_org_file()) {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled(format!("resolve {}", wanted)));
            }

            let url = self.config.file_url(&entry.name);
            let bytes = match self.source.fetch(&url, cancel).await {
                Ok(bytes) => bytes,
                Err(Error::Cancelled(what)) => return Err(Error::Cancelled(what)),
                Err(e) => {
                    warn!(filename = %entry.name, error = %e, "Skipping unreadable note during resolve");
                    continue;
                }
            };

            let Some(found) = decode_body(&bytes).ok().and_then(extract_id) else {
                continue;
            };
            self.map.write().await.insert(found, entry.name.clone());

            if found == wanted {
                debug!(note_id = %wanted, filename = %entry.name, "Resolved by scan");
                return Ok(entry.name.clone());
            }
        }

        Err(Error::NoteNotFound(wanted.to_string()))
    }

    /// Cached filename for `id`, without touching the network.
    pub async fn cached(&self, id: &Uuid) -> Option<String> {
        self.map.read().await.get(id).cloned()
    }

    /// Record mappings learned elsewhere, overwriting existing entries.
    pub async fn seed<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (Uuid, String)>,
    {
        let mut map = self.map.write().await;
        for (id, filename) in pairs {
            map.insert(id, filename);
        }
    }

    /// Drop the mapping for `id`.
    pub async fn forget(&self, id: &Uuid) {
        self.map.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.map.read().await.is_empty()
    }
}

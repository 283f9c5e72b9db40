//! Cache coordinator.
//!
//! Owns the three published snapshots and the id resolver. Each snapshot
//! sits behind its own `RwLock<Option<Arc<_>>>`: builders run outside any
//! lock and publish by swapping the `Arc`, so readers see either the old
//! snapshot or the new one in full. `None` means never built.
//!
//! There is no consistency guarantee across the three snapshots; they may
//! advance at different instants within one refresh.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use groundwave_core::defaults::SLOW_BUILD_THRESHOLD_MS;
use groundwave_core::{
    parse_date_string, parse_note_id, BuildStats, Error, JournalEntry, LinkSourceId, NoteSummary, RemoteDirectory,
    RemoteEntry, Result, TimelineNote, ZkConfig,
};
use groundwave_webdav::WebDavClient;

use crate::journal_index::{self, JournalSnapshot};
use crate::link_index::{self, LinkSnapshot};
use crate::resolver::IdResolver;
use crate::timeline_index::{self, TimelineSnapshot};

/// Statistics for one full refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub links: BuildStats,
    pub journal: BuildStats,
    pub timeline: BuildStats,
    pub duration_ms: u64,
}

/// Injectable cache over one Zettelkasten directory.
pub struct ZkCache {
    pub(crate) source: Arc<dyn RemoteDirectory>,
    pub(crate) config: ZkConfig,
    pub(crate) resolver: IdResolver,
    links: RwLock<Option<Arc<LinkSnapshot>>>,
    journal: RwLock<Option<Arc<JournalSnapshot>>>,
    timeline: RwLock<Option<Arc<TimelineSnapshot>>>,
}

impl ZkCache {
    pub fn new(source: Arc<dyn RemoteDirectory>, config: ZkConfig) -> Self {
        let resolver = IdResolver::new(source.clone(), config.clone());
        Self {
            source,
            config,
            resolver,
            links: RwLock::new(None),
            journal: RwLock::new(None),
            timeline: RwLock::new(None),
        }
    }

    /// Cache backed by a WebDAV client built from `config`.
    pub fn from_config(config: ZkConfig) -> Result<Self> {
        let client = WebDavClient::new(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn config(&self) -> &ZkConfig {
        &self.config
    }

    pub fn resolver(&self) -> &IdResolver {
        &self.resolver
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    pub async fn links_snapshot(&self) -> Option<Arc<LinkSnapshot>> {
        self.links.read().await.clone()
    }

    pub async fn journal_snapshot(&self) -> Option<Arc<JournalSnapshot>> {
        self.journal.read().await.clone()
    }

    pub async fn timeline_snapshot(&self) -> Option<Arc<TimelineSnapshot>> {
        self.timeline.read().await.clone()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Sources linking to `target_id`, in scan order.
    pub async fn get_backlinks(&self, target_id: &str) -> Result<Vec<LinkSourceId>> {
        let target = parse_note_id(target_id)?;
        Ok(self
            .links_snapshot()
            .await
            .map(|s| s.backlinks(&target).to_vec())
            .unwrap_or_default())
    }

    /// Targets linked from `source_id` (a UUID or `daily:YYYY-MM-DD`), sorted.
    pub async fn get_forward_links(&self, source_id: &str) -> Result<Vec<Uuid>> {
        let source: LinkSourceId = source_id.parse()?;
        Ok(self
            .links_snapshot()
            .await
            .map(|s| s.forward_links(&source).to_vec())
            .unwrap_or_default())
    }

    /// Unknown and malformed ids are not public.
    pub async fn is_public(&self, id: &str) -> bool {
        let Ok(id) = parse_note_id(id) else {
            return false;
        };
        match self.links_snapshot().await {
            Some(snapshot) => snapshot.is_public(&id),
            None => false,
        }
    }

    /// Every indexed zettel, sorted by title.
    pub async fn note_summaries(&self) -> Vec<NoteSummary> {
        let Some(snapshot) = self.links_snapshot().await else {
            return Vec::new();
        };
        let mut summaries: Vec<NoteSummary> = snapshot
            .note_ids()
            .map(|id| summary(&snapshot, &LinkSourceId::Note(*id)))
            .collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    /// Backlinks of `target_id` as summaries, in scan order.
    pub async fn backlink_summaries(&self, target_id: &str) -> Result<Vec<NoteSummary>> {
        let target = parse_note_id(target_id)?;
        let Some(snapshot) = self.links_snapshot().await else {
            return Ok(Vec::new());
        };
        Ok(snapshot
            .backlinks(&target)
            .iter()
            .map(|source| summary(&snapshot, source))
            .collect())
    }

    /// All journal entries, newest first.
    pub async fn get_journal_entries(&self) -> Vec<JournalEntry> {
        self.journal_snapshot()
            .await
            .map(|s| s.newest_first().cloned().collect())
            .unwrap_or_default()
    }

    /// Journal entry for a `YYYY-MM-DD` date.
    pub async fn get_journal_entry(&self, date_string: &str) -> Result<JournalEntry> {
        let date = parse_date_string(date_string)
            .ok_or_else(|| Error::InvalidInput(format!("not a YYYY-MM-DD date: {}", date_string)))?;
        self.journal_snapshot()
            .await
            .and_then(|s| s.get(&date).cloned())
            .ok_or_else(|| Error::NotFound(format!("journal entry {}", date_string)))
    }

    pub async fn get_timeline_by_date(&self) -> BTreeMap<String, Vec<TimelineNote>> {
        self.timeline_snapshot()
            .await
            .map(|s| s.by_date().clone())
            .unwrap_or_default()
    }

    pub async fn last_link_build_at(&self) -> Option<DateTime<Utc>> {
        self.links_snapshot().await.map(|s| s.built_at())
    }

    pub async fn last_journal_build_at(&self) -> Option<DateTime<Utc>> {
        self.journal_snapshot().await.map(|s| s.built_at())
    }

    pub async fn last_timeline_build_at(&self) -> Option<DateTime<Utc>> {
        self.timeline_snapshot().await.map(|s| s.built_at())
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// List both directories once and rebuild all three snapshots.
    ///
    /// A cancelled refresh publishes nothing.
    #[instrument(skip(self, cancel), fields(subsystem = "zk", component = "cache", op = "refresh_all"))]
    pub async fn refresh_all(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        let start = Instant::now();
        let main = self.list(self.config.notes_root(), cancel).await?;
        let daily = self.list(&self.config.daily_dir(), cancel).await?;
        let source = self.source.as_ref();

        let (links, journal, timeline) = tokio::join!(
            link_index::build(source, &self.config, &main, &daily, cancel),
            journal_index::build(source, &self.config, &daily, cancel),
            timeline_index::build(source, &self.config, &main, cancel),
        );
        ensure_not_cancelled(cancel, "refresh")?;

        let report = RefreshReport {
            links: links.stats(),
            journal: journal.stats(),
            timeline: timeline.stats(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        self.publish_links(links).await;
        self.publish_journal(journal).await;
        self.publish_timeline(timeline).await;

        if report.duration_ms > SLOW_BUILD_THRESHOLD_MS {
            warn!(slow = true, duration_ms = report.duration_ms, "Slow refresh");
        }
        info!(
            links = report.links.indexed,
            journal = report.journal.indexed,
            timeline = report.timeline.indexed,
            duration_ms = report.duration_ms,
            "Refresh complete"
        );
        Ok(report)
    }

    /// Rebuild only the link snapshot.
    pub async fn refresh_links(&self, cancel: &CancellationToken) -> Result<BuildStats> {
        let main = self.list(self.config.notes_root(), cancel).await?;
        let daily = self.list(&self.config.daily_dir(), cancel).await?;
        let snapshot =
            link_index::build(self.source.as_ref(), &self.config, &main, &daily, cancel).await;
        ensure_not_cancelled(cancel, "link build")?;
        let stats = snapshot.stats();
        self.publish_links(snapshot).await;
        Ok(stats)
    }

    /// Rebuild only the journal snapshot.
    pub async fn refresh_journal(&self, cancel: &CancellationToken) -> Result<BuildStats> {
        let daily = self.list(&self.config.daily_dir(), cancel).await?;
        let snapshot = journal_index::build(self.source.as_ref(), &self.config, &daily, cancel).await;
        ensure_not_cancelled(cancel, "journal build")?;
        let stats = snapshot.stats();
        self.publish_journal(snapshot).await;
        Ok(stats)
    }

    /// Rebuild only the timeline snapshot.
    pub async fn refresh_timeline(&self, cancel: &CancellationToken) -> Result<BuildStats> {
        let main = self.list(self.config.notes_root(), cancel).await?;
        let snapshot = timeline_index::build(self.source.as_ref(), &self.config, &main, cancel).await;
        ensure_not_cancelled(cancel, "timeline build")?;
        let stats = snapshot.stats();
        self.publish_timeline(snapshot).await;
        Ok(stats)
    }

    /// Listing failures abort the build.
    async fn list(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<RemoteEntry>> {
        self.source
            .list_directory(url, cancel)
            .await
            .map_err(|e| match e {
                Error::Cancelled(what) => Error::Cancelled(what),
                other => Error::Build(format!("listing {} failed: {}", url, other)),
            })
    }

    async fn publish_links(&self, snapshot: LinkSnapshot) {
        self.resolver
            .seed(snapshot.filenames().map(|(id, f)| (*id, f.clone())))
            .await;
        *self.links.write().await = Some(Arc::new(snapshot));
        debug!("Published link snapshot");
    }

    async fn publish_journal(&self, snapshot: JournalSnapshot) {
        *self.journal.write().await = Some(Arc::new(snapshot));
        debug!("Published journal snapshot");
    }

    async fn publish_timeline(&self, snapshot: TimelineSnapshot) {
        *self.timeline.write().await = Some(Arc::new(snapshot));
        debug!("Published timeline snapshot");
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken, what: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled(what.to_string()));
    }
    Ok(())
}

fn summary(snapshot: &LinkSnapshot, source: &LinkSourceId) -> NoteSummary {
    match source {
        LinkSourceId::Note(id) => NoteSummary {
            id: source.to_string(),
            title: snapshot
                .title(id)
                .map(str::to_string)
                .unwrap_or_else(|| id.to_string()),
            is_public: snapshot.is_public(id),
        },
        LinkSourceId::Daily(date) => NoteSummary {
            id: source.to_string(),
            title: date.format("%Y-%m-%d").to_string(),
            is_public: false,
        },
    }
}

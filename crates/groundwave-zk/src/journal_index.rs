//! Journal snapshot: rendered daily notes keyed by date.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use groundwave_core::defaults::{DEFAULT_NOTE_TITLE, INTERNAL_NOTE_BASE_PATH};
use groundwave_core::{BuildStats, JournalEntry, RemoteDirectory, RemoteEntry, Result, ZkConfig};

use crate::link_index::daily_date;
use crate::org::{build_preview, decode_body, extract_title, render_html};
use crate::scan::{fetch_in_order, warn_skip};

#[derive(Debug, Clone)]
pub struct JournalSnapshot {
    entries: BTreeMap<NaiveDate, JournalEntry>,
    built_at: DateTime<Utc>,
    stats: BuildStats,
}

impl JournalSnapshot {
    pub fn get(&self, date: &NaiveDate) -> Option<&JournalEntry> {
        self.entries.get(date)
    }

    /// Entries, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.values().rev()
    }

    pub fn entries(&self) -> &BTreeMap<NaiveDate, JournalEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

/// Render one daily note body into a journal entry.
pub(crate) fn journal_entry(
    date: NaiveDate,
    filename: &str,
    body: &str,
    updated_at: Option<DateTime<Utc>>,
) -> Result<JournalEntry> {
    let html_body = render_html(body, INTERNAL_NOTE_BASE_PATH)?;
    let date_string = date.format("%Y-%m-%d").to_string();

    let preview = build_preview(body);
    let preview_html = match render_html(&preview.text, INTERNAL_NOTE_BASE_PATH) {
        Ok(html) => html,
        Err(e) => {
            debug!(filename, error = %e, "Preview render failed, keeping entry without preview");
            String::new()
        }
    };

    let mut title = extract_title(body);
    if title == DEFAULT_NOTE_TITLE {
        title = date_string.clone();
    }

    Ok(JournalEntry {
        date,
        date_string,
        filename: filename.to_string(),
        title,
        html_body,
        preview_html,
        has_more: preview.has_more,
        updated_at,
    })
}

/// Build a journal snapshot from the daily directory listing.
#[instrument(
    skip_all,
    fields(subsystem = "zk", component = "journal_index", op = "build")
)]
pub async fn build(
    source: &dyn RemoteDirectory,
    config: &ZkConfig,
    daily: &[RemoteEntry],
    cancel: &CancellationToken,
) -> JournalSnapshot {
    let start = Instant::now();
    let mut stats = BuildStats::default();
    let mut work = Vec::new();

    for entry in daily.iter().filter(|e| e.is_org_file()) {
        stats.scanned += 1;
        match daily_date(&entry.name) {
            Some(date) => work.push((
                config.daily_file_url(&entry.name),
                (date, entry.name.clone(), entry.modified),
            )),
            None => {
                trace!(filename = %entry.name, "Ignoring daily file with non-date name");
                stats.skipped += 1;
            }
        }
    }

    let fetched = fetch_in_order(source, work, config.fetch_concurrency, cancel).await;
    let mut entries = BTreeMap::new();

    for ((date, filename, modified), result) in fetched {
        let entry = result.and_then(|bytes| {
            let body = decode_body(&bytes)?;
            journal_entry(date, &filename, body, modified)
        });
        match entry {
            Ok(entry) => {
                entries.insert(date, entry);
                stats.indexed += 1;
            }
            Err(e) => {
                warn_skip("journal_index", &filename, &e);
                stats.skipped += 1;
            }
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        result_count = stats.indexed,
        skipped = stats.skipped,
        duration_ms = stats.duration_ms,
        "Journal index built"
    );

    JournalSnapshot {
        entries,
        built_at: Utc::now(),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::MemoryDirectory;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn build_from(dir: &MemoryDirectory, config: &ZkConfig) -> JournalSnapshot {
        let cancel = CancellationToken::new();
        let daily = dir.list_directory(&config.daily_dir(), &cancel).await.unwrap();
        build(dir, config, &daily, &cancel).await
    }

    fn setup() -> (MemoryDirectory, ZkConfig) {
        let config = ZkConfig::new("https://host/zk/index.org").unwrap();
        (MemoryDirectory::new(&config), config)
    }

    #[test]
    fn test_title_falls_back_to_date() {
        let entry = journal_entry(date(2024, 1, 1), "2024-01-01.org", "Walked.\n", None).unwrap();
        assert_eq!(entry.title, "2024-01-01");
        assert_eq!(entry.date_string, "2024-01-01");
        assert!(!entry.has_more);
        assert!(entry.preview_html.contains("Walked."));
    }

    #[test]
    fn test_explicit_title_kept() {
        let entry = journal_entry(
            date(2024, 1, 1),
            "2024-01-01.org",
            "#+TITLE: New Year\n\nQuiet.\n",
            None,
        )
        .unwrap();
        assert_eq!(entry.title, "New Year");
    }

    #[test]
    fn test_links_use_internal_base() {
        let entry = journal_entry(
            date(2024, 1, 1),
            "2024-01-01.org",
            "[[id:33333333-3333-3333-3333-333333333333][X]]\n",
            None,
        )
        .unwrap();
        assert!(entry
            .html_body
            .contains("href=\"/zk/note/33333333-3333-3333-3333-333333333333\""));
    }

    #[test]
    fn test_body_render_failure_is_error() {
        let result = journal_entry(date(2024, 1, 1), "2024-01-01.org", "#+BEGIN_SRC\nnever closed\n", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_preview_render_failure_keeps_entry() {
        let body = "#+BEGIN_SRC sh\necho a\n\necho b\n\necho c\n#+END_SRC\n";
        let entry = journal_entry(date(2024, 1, 3), "2024-01-03.org", body, None).unwrap();
        assert_eq!(entry.date_string, "2024-01-03");
        assert!(entry.preview_html.is_empty());
        assert!(!entry.html_body.is_empty());
        assert!(entry.has_more);
    }

    #[test]
    fn test_long_entry_has_more() {
        let body = "one\n\ntwo\n\nthree\n";
        let entry = journal_entry(date(2024, 1, 2), "2024-01-02.org", body, None).unwrap();
        assert!(entry.has_more);
        assert!(!entry.preview_html.contains("three"));
        assert!(entry.html_body.contains("three"));
    }

    #[tokio::test]
    async fn test_build_orders_newest_first() {
        let (dir, config) = setup();
        dir.add_daily("2024-01-01.org", "First.\n");
        dir.add_daily("2024-03-05.org", "Later.\n");
        dir.add_daily("2023-12-31.org", "Earlier.\n");
        let snapshot = build_from(&dir, &config).await;

        let dates: Vec<_> = snapshot.newest_first().map(|e| e.date_string.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-05", "2024-01-01", "2023-12-31"]);
        assert_eq!(snapshot.stats().indexed, 3);
    }

    #[tokio::test]
    async fn test_build_skips_bad_names_and_render_failures() {
        let (dir, config) = setup();
        dir.add_daily("2024-01-01.org", "Fine.\n");
        dir.add_daily("2024-02-31.org", "Impossible date.\n");
        dir.add_daily("notes.org", "Not a day.\n");
        dir.add_daily("2024-01-02.org", "#+BEGIN_QUOTE\nopen\n");
        let snapshot = build_from(&dir, &config).await;

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(&date(2024, 1, 1)).is_some());
        assert_eq!(snapshot.stats().skipped, 3);
    }

    #[tokio::test]
    async fn test_updated_at_from_listing() {
        let (dir, config) = setup();
        let modified = Utc.with_ymd_and_hms(2024, 1, 1, 21, 30, 0).unwrap();
        dir.add_daily_modified("2024-01-01.org", "Walked.\n", Some(modified));
        let snapshot = build_from(&dir, &config).await;

        let entry = snapshot.get(&date(2024, 1, 1)).unwrap();
        assert_eq!(entry.updated_at, Some(modified));
    }

    #[tokio::test]
    async fn test_empty_daily_directory() {
        let (dir, config) = setup();
        let snapshot = build_from(&dir, &config).await;
        assert!(snapshot.is_empty());
    }
}

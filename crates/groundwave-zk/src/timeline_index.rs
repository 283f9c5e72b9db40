//! Timeline snapshot: timestamped zettels bucketed by day.
//!
//! Only files named `YYYYMMDDHHMMSS-slug.org` take part. A `#+DATE:`
//! directive naming a different day moves the note to that day at
//! midnight UTC.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, trace};

use groundwave_core::defaults::DEFAULT_NOTE_TITLE;
use groundwave_core::{BuildStats, RemoteDirectory, RemoteEntry, TimelineNote, ZkConfig};

use crate::org::{decode_body, extract_date_override, extract_id, extract_title};
use crate::scan::{fetch_in_order, warn_skip};

static TIMESTAMPED_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{14})-.*\.org$").expect("timeline filename pattern is valid"));

/// UTC timestamp encoded in a `YYYYMMDDHHMMSS-*.org` filename.
pub(crate) fn filename_timestamp(filename: &str) -> Option<DateTime<Utc>> {
    let caps = TIMESTAMPED_FILENAME.captures(filename)?;
    let naive = NaiveDateTime::parse_from_str(caps.get(1)?.as_str(), "%Y%m%d%H%M%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone)]
pub struct TimelineSnapshot {
    by_date: BTreeMap<String, Vec<TimelineNote>>,
    built_at: DateTime<Utc>,
    stats: BuildStats,
}

impl TimelineSnapshot {
    /// Day buckets keyed by `YYYY-MM-DD`, each newest first.
    pub fn by_date(&self) -> &BTreeMap<String, Vec<TimelineNote>> {
        &self.by_date
    }

    pub fn day(&self, date_string: &str) -> &[TimelineNote] {
        self.by_date
            .get(date_string)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

fn placement(timestamp: DateTime<Utc>, override_day: Option<NaiveDate>) -> DateTime<Utc> {
    match override_day {
        Some(day) if day != timestamp.date_naive() => day
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight))
            .unwrap_or(timestamp),
        _ => timestamp,
    }
}

/// Build a timeline snapshot from the notes directory listing.
#[instrument(
    skip_all,
    fields(subsystem = "zk", component = "timeline_index", op = "build")
)]
pub async fn build(
    source: &dyn RemoteDirectory,
    config: &ZkConfig,
    main: &[RemoteEntry],
    cancel: &CancellationToken,
) -> TimelineSnapshot {
    let start = Instant::now();
    let mut stats = BuildStats::default();
    let mut work = Vec::new();

    for entry in main.iter().filter(|e| e.is_org_file()) {
        stats.scanned += 1;
        if entry.name == config.index_filename() {
            stats.skipped += 1;
            continue;
        }
        match filename_timestamp(&entry.name) {
            Some(ts) => work.push((config.file_url(&entry.name), (entry.name.clone(), ts))),
            None => {
                trace!(filename = %entry.name, "Not a timestamped note");
                stats.skipped += 1;
            }
        }
    }

    let fetched = fetch_in_order(source, work, config.fetch_concurrency, cancel).await;
    let mut by_date: BTreeMap<String, Vec<TimelineNote>> = BTreeMap::new();

    for ((filename, ts), result) in fetched {
        let body = match result.and_then(|bytes| decode_body(&bytes).map(str::to_owned)) {
            Ok(body) => body,
            Err(e) => {
                warn_skip("timeline_index", &filename, &e);
                stats.skipped += 1;
                continue;
            }
        };
        let Some(id) = extract_id(&body) else {
            trace!(filename = %filename, "No :ID: property, skipping");
            stats.skipped += 1;
            continue;
        };

        let mut title = extract_title(&body);
        if title == DEFAULT_NOTE_TITLE {
            title = filename.trim_end_matches(".org").to_string();
        }
        let timestamp = placement(ts, extract_date_override(&body));
        let date_string = timestamp.format("%Y-%m-%d").to_string();

        by_date
            .entry(date_string.clone())
            .or_default()
            .push(TimelineNote {
                id,
                title,
                filename,
                timestamp,
                date_string,
            });
        stats.indexed += 1;
    }

    for bucket in by_date.values_mut() {
        bucket.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.filename.cmp(&b.filename))
        });
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        result_count = stats.indexed,
        days = by_date.len(),
        skipped = stats.skipped,
        duration_ms = stats.duration_ms,
        "Timeline index built"
    );

    TimelineSnapshot {
        by_date,
        built_at: Utc::now(),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{note_body, MemoryDirectory};

    const D: &str = "44444444-4444-4444-4444-444444444444";
    const E: &str = "55555555-5555-5555-5555-555555555555";

    fn setup() -> (MemoryDirectory, ZkConfig) {
        let config = ZkConfig::new("https://host/zk/index.org").unwrap();
        (MemoryDirectory::new(&config), config)
    }

    async fn build_from(dir: &MemoryDirectory, config: &ZkConfig) -> TimelineSnapshot {
        let cancel = CancellationToken::new();
        let main = dir.list_directory(config.notes_root(), &cancel).await.unwrap();
        build(dir, config, &main, &cancel).await
    }

    #[test]
    fn test_filename_timestamp() {
        let ts = filename_timestamp("20240301090000-x.org").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        assert!(filename_timestamp("20241301090000-x.org").is_none());
        assert!(filename_timestamp("2024030109000-x.org").is_none());
        assert!(filename_timestamp("20240301090000.org").is_none());
    }

    #[test]
    fn test_placement_same_day_keeps_time() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(placement(ts, NaiveDate::from_ymd_opt(2024, 3, 1)), ts);
        assert_eq!(placement(ts, None), ts);
    }

    #[tokio::test]
    async fn test_bucket_by_filename_day() {
        let (dir, config) = setup();
        dir.add_note("20240301090000-x.org", &note_body(D, "X", ""));
        let snapshot = build_from(&dir, &config).await;

        let day = snapshot.day("2024-03-01");
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].title, "X");
        assert_eq!(day[0].timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_date_override_moves_to_midnight() {
        let (dir, config) = setup();
        dir.add_note(
            "20240301090000-x.org",
            &format!("{}#+DATE: 2024-03-02\n", note_body(D, "X", "")),
        );
        let snapshot = build_from(&dir, &config).await;

        assert!(snapshot.day("2024-03-01").is_empty());
        let day = snapshot.day("2024-03-02");
        assert_eq!(day[0].timestamp, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
        assert_eq!(day[0].date_string, "2024-03-02");
    }

    #[tokio::test]
    async fn test_bucket_sorted_newest_first() {
        let (dir, config) = setup();
        dir.add_note("20240301080000-early.org", &note_body(D, "Early", ""));
        dir.add_note("20240301170000-late.org", &note_body(E, "Late", ""));
        let snapshot = build_from(&dir, &config).await;

        let titles: Vec<_> = snapshot.day("2024-03-01").iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Late", "Early"]);
    }

    #[tokio::test]
    async fn test_skips_index_untimestamped_and_idless() {
        let (dir, config) = setup();
        dir.add_note("index.org", &note_body(D, "Index", ""));
        dir.add_note("plain.org", &note_body(E, "Plain", ""));
        dir.add_note("20240301090000-noid.org", "#+TITLE: No id\n");
        let snapshot = build_from(&dir, &config).await;

        assert!(snapshot.by_date().is_empty());
        assert_eq!(snapshot.stats().skipped, 3);
        assert_eq!(dir.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_title_falls_back_to_stem() {
        let (dir, config) = setup();
        dir.add_note(
            "20240301090000-bare.org",
            &format!(":PROPERTIES:\n:ID: {}\n:END:\ntext\n", D),
        );
        let snapshot = build_from(&dir, &config).await;
        assert_eq!(snapshot.day("2024-03-01")[0].title, "20240301090000-bare");
    }
}

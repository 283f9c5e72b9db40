//! Link graph snapshot: backlinks, forward links, and public flags.
//!
//! Sources are zettels (by `:ID:`) in the notes directory and daily notes
//! (as `daily:YYYY-MM-DD`) in the daily directory. For every snapshot,
//! `t ∈ forward_links(s)` exactly when `s ∈ backlinks(t)`. Backlink lists
//! keep scan order; forward-link lists are sorted by target id and free of
//! duplicates. Self-links are kept.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, trace, warn};
use uuid::Uuid;

use groundwave_core::{BuildStats, LinkSourceId, RemoteDirectory, RemoteEntry, ZkConfig};

use crate::org::{decode_body, extract_id, extract_links, extract_title, is_public};
use crate::scan::{fetch_in_order, warn_skip};

pub(crate) static DAILY_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})\.org$").expect("daily filename pattern is valid"));

/// Date of a `YYYY-MM-DD.org` filename.
pub(crate) fn daily_date(filename: &str) -> Option<NaiveDate> {
    let caps = DAILY_FILENAME.captures(filename)?;
    NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()
}

/// An immutable link graph built in one pass.
#[derive(Debug, Clone)]
pub struct LinkSnapshot {
    backlinks: HashMap<Uuid, Vec<LinkSourceId>>,
    forward_links: HashMap<LinkSourceId, Vec<Uuid>>,
    public: HashMap<Uuid, bool>,
    titles: HashMap<Uuid, String>,
    filenames: HashMap<Uuid, String>,
    built_at: DateTime<Utc>,
    stats: BuildStats,
}

impl LinkSnapshot {
    pub fn backlinks(&self, target: &Uuid) -> &[LinkSourceId] {
        self.backlinks.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn forward_links(&self, source: &LinkSourceId) -> &[Uuid] {
        self.forward_links
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Absent ids are not public.
    pub fn is_public(&self, id: &Uuid) -> bool {
        self.public.get(id).copied().unwrap_or(false)
    }

    pub fn title(&self, id: &Uuid) -> Option<&str> {
        self.titles.get(id).map(String::as_str)
    }

    /// Every zettel id seen in this build.
    pub fn note_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.public.keys()
    }

    /// `(id, filename)` pairs observed while building.
    pub fn filenames(&self) -> impl Iterator<Item = (&Uuid, &String)> {
        self.filenames.iter()
    }

    pub fn backlink_map(&self) -> &HashMap<Uuid, Vec<LinkSourceId>> {
        &self.backlinks
    }

    pub fn forward_link_map(&self) -> &HashMap<LinkSourceId, Vec<Uuid>> {
        &self.forward_links
    }

    pub fn public_map(&self) -> &HashMap<Uuid, bool> {
        &self.public
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Main,
    Daily(NaiveDate),
}

#[derive(Default)]
struct GraphBuilder {
    backlinks: HashMap<Uuid, Vec<LinkSourceId>>,
    forward_links: HashMap<LinkSourceId, Vec<Uuid>>,
    public: HashMap<Uuid, bool>,
    titles: HashMap<Uuid, String>,
    filenames: HashMap<Uuid, String>,
}

impl GraphBuilder {
    fn add_source(&mut self, source: LinkSourceId, targets: Vec<Uuid>) {
        let forward = self.forward_links.entry(source).or_default();
        let mut seen: HashSet<Uuid> = forward.iter().copied().collect();
        for target in targets {
            if seen.insert(target) {
                forward.push(target);
                self.backlinks.entry(target).or_default().push(source);
            }
        }
        forward.sort();
    }
}

/// Build a link snapshot from directory listings already taken.
#[instrument(
    skip_all,
    fields(subsystem = "zk", component = "link_index", op = "build")
)]
pub async fn build(
    source: &dyn RemoteDirectory,
    config: &ZkConfig,
    main: &[RemoteEntry],
    daily: &[RemoteEntry],
    cancel: &CancellationToken,
) -> LinkSnapshot {
    let start = Instant::now();
    let mut stats = BuildStats::default();
    let mut work: Vec<(String, (String, Kind))> = Vec::new();

    for entry in main.iter().filter(|e| e.is_org_file()) {
        stats.scanned += 1;
        work.push((config.file_url(&entry.name), (entry.name.clone(), Kind::Main)));
    }
    for entry in daily.iter().filter(|e| e.is_org_file()) {
        stats.scanned += 1;
        match daily_date(&entry.name) {
            Some(date) => work.push((
                config.daily_file_url(&entry.name),
                (entry.name.clone(), Kind::Daily(date)),
            )),
            None => {
                trace!(filename = %entry.name, "Ignoring daily file with non-date name");
                stats.skipped += 1;
            }
        }
    }

    let fetched = fetch_in_order(source, work, config.fetch_concurrency, cancel).await;
    let mut graph = GraphBuilder::default();

    for ((filename, kind), result) in fetched {
        let body = match result.and_then(|bytes| decode_body(&bytes).map(str::to_owned)) {
            Ok(body) => body,
            Err(e) => {
                warn_skip("link_index", &filename, &e);
                stats.skipped += 1;
                continue;
            }
        };

        let source_id = match kind {
            Kind::Daily(date) => LinkSourceId::Daily(date),
            Kind::Main => {
                let Some(id) = extract_id(&body) else {
                    trace!(filename = %filename, "No :ID: property, skipping");
                    stats.skipped += 1;
                    continue;
                };
                if let Some(previous) = graph.filenames.get(&id) {
                    warn!(note_id = %id, filename = %filename, previous = %previous, "Duplicate note id, merging links");
                } else {
                    graph.public.insert(id, is_public(&body));
                    graph.titles.insert(id, extract_title(&body));
                    graph.filenames.insert(id, filename.clone());
                }
                LinkSourceId::Note(id)
            }
        };

        graph.add_source(source_id, extract_links(&body));
        stats.indexed += 1;
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        result_count = stats.indexed,
        skipped = stats.skipped,
        edges = graph.backlinks.values().map(Vec::len).sum::<usize>(),
        duration_ms = stats.duration_ms,
        "Link index built"
    );

    LinkSnapshot {
        backlinks: graph.backlinks,
        forward_links: graph.forward_links,
        public: graph.public,
        titles: graph.titles,
        filenames: graph.filenames,
        built_at: Utc::now(),
        stats,
    }
}

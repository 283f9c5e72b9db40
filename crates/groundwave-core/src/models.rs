//! Types produced by the Zettelkasten cache.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::{DAILY_ID_PREFIX, JOURNAL_BASE_PATH};
use crate::note_id::parse_note_id;
use crate::Error;

// =============================================================================
// REMOTE LISTING
// =============================================================================

/// One member of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Percent-decoded path component of the entry's href.
    pub path: String,
    /// Last path segment (file or directory name).
    pub name: String,
    pub is_dir: bool,
    /// `getcontentlength`, when the server reports one.
    pub size: Option<u64>,
    /// `getlastmodified`, when the server reports one.
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    /// Whether this entry is an Org file.
    pub fn is_org_file(&self) -> bool {
        !self.is_dir && self.name.ends_with(".org")
    }
}

// =============================================================================
// NOTES
// =============================================================================

/// A rendered note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub filename: String,
    pub is_public: bool,
    pub html_body: String,
}

/// A note's raw Org source, for consumers that do their own processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatNote {
    pub id: Uuid,
    pub title: String,
    pub raw_body: String,
}

/// Lightweight note reference used in listings and backlink panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    /// Canonical link source id (UUID or `daily:YYYY-MM-DD`).
    pub id: String,
    pub title: String,
    pub is_public: bool,
}

/// A daily note with its rendered body and preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub date: NaiveDate,
    /// `YYYY-MM-DD`
    pub date_string: String,
    pub filename: String,
    pub title: String,
    pub html_body: String,
    pub preview_html: String,
    /// The preview dropped content from the note.
    pub has_more: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A timestamped zettel placed on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineNote {
    pub id: Uuid,
    pub title: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    /// Day bucket, `YYYY-MM-DD`.
    pub date_string: String,
}

/// Counters reported by an index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Listing entries considered.
    pub scanned: usize,
    /// Entries that contributed to the index.
    pub indexed: usize,
    /// Entries skipped because of fetch, parse, or render failures.
    pub skipped: usize,
    pub duration_ms: u64,
}

// =============================================================================
// LINK GRAPH IDENTIFIERS
// =============================================================================

/// Source of a link in the link graph.
///
/// Zettels are identified by their `:ID:` UUID. Daily notes carry no id of
/// their own and take part under the synthetic form `daily:YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LinkSourceId {
    Note(Uuid),
    Daily(NaiveDate),
}

impl LinkSourceId {
    pub fn is_daily(&self) -> bool {
        matches!(self, LinkSourceId::Daily(_))
    }

    /// User-facing URL for this source.
    ///
    /// Notes link to `{note_base}/<uuid>`; daily sources link to the journal
    /// page for their date.
    pub fn href(&self, note_base: &str) -> String {
        match self {
            LinkSourceId::Note(id) => format!("{}/{}", note_base.trim_end_matches('/'), id),
            LinkSourceId::Daily(date) => {
                format!("{}/{}", JOURNAL_BASE_PATH, date.format("%Y-%m-%d"))
            }
        }
    }
}

/// Parse a strict `YYYY-MM-DD` date. Unpadded fields, signs and
/// surrounding whitespace are rejected.
pub fn parse_date_string(raw: &str) -> Option<NaiveDate> {
    let shaped = raw.len() == 10
        && raw.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

impl fmt::Display for LinkSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSourceId::Note(id) => write!(f, "{}", id),
            LinkSourceId::Daily(date) => write!(f, "{}{}", DAILY_ID_PREFIX, date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for LinkSourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix(DAILY_ID_PREFIX) {
            return parse_date_string(rest)
                .map(LinkSourceId::Daily)
                .ok_or_else(|| Error::InvalidId(s.to_string()));
        }
        parse_note_id(s).map(LinkSourceId::Note)
    }
}

impl From<LinkSourceId> for String {
    fn from(id: LinkSourceId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for LinkSourceId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Uuid> for LinkSourceId {
    fn from(id: Uuid) -> Self {
        LinkSourceId::Note(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_id_display() {
        let id = LinkSourceId::Daily(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(id.to_string(), "daily:2024-01-01");
    }

    #[test]
    fn test_note_id_display_is_lowercase() {
        let uuid = Uuid::parse_str("ABCDEF01-2345-6789-ABCD-EF0123456789").unwrap();
        assert_eq!(
            LinkSourceId::Note(uuid).to_string(),
            "abcdef01-2345-6789-abcd-ef0123456789"
        );
    }

    #[test]
    fn test_parse_daily_id() {
        let id: LinkSourceId = "daily:2024-03-02".parse().unwrap();
        assert_eq!(
            id,
            LinkSourceId::Daily(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
        );
        assert!(id.is_daily());
    }

    #[test]
    fn test_parse_rejects_bad_daily_date() {
        assert!("daily:2024-13-40".parse::<LinkSourceId>().is_err());
        assert!("daily:".parse::<LinkSourceId>().is_err());
        assert!("daily:2024-1-1".parse::<LinkSourceId>().is_err());
        assert!("daily: 2024-01-01".parse::<LinkSourceId>().is_err());
    }

    #[test]
    fn test_parse_date_string_is_strict() {
        assert_eq!(
            parse_date_string("2024-01-01"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_date_string("2024-1-1"), None);
        assert_eq!(parse_date_string("2024-01-1"), None);
        assert_eq!(parse_date_string("+2024-01-01"), None);
        assert_eq!(parse_date_string("2024-02-30"), None);
    }

    #[test]
    fn test_parse_note_id() {
        let id: LinkSourceId = "22222222-2222-2222-2222-222222222222".parse().unwrap();
        assert!(!id.is_daily());
    }

    #[test]
    fn test_href_for_note_and_daily() {
        let note: LinkSourceId = "22222222-2222-2222-2222-222222222222".parse().unwrap();
        assert_eq!(
            note.href("/note/"),
            "/note/22222222-2222-2222-2222-222222222222"
        );
        let daily: LinkSourceId = "daily:2024-01-01".parse().unwrap();
        assert_eq!(daily.href("/note"), "/zk/journal/2024-01-01");
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id: LinkSourceId = "daily:2024-01-01".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"daily:2024-01-01\"");
        let back: LinkSourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_remote_entry_is_org_file() {
        let entry = RemoteEntry {
            path: "/zk/a.org".into(),
            name: "a.org".into(),
            is_dir: false,
            size: Some(10),
            modified: None,
        };
        assert!(entry.is_org_file());
        let dir = RemoteEntry {
            is_dir: true,
            name: "daily".into(),
            ..entry.clone()
        };
        assert!(!dir.is_org_file());
    }
}

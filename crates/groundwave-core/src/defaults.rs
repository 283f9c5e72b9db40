//! Centralized default constants for the Zettelkasten cache.
//!
//! **This module is the single source of truth** for shared policy values.
//! Configuration falls back to these when the environment does not override
//! them.

// =============================================================================
// REFRESH POLICY
// =============================================================================

/// Interval between background refresh cycles (10 minutes).
pub const REFRESH_INTERVAL_SECS: u64 = 600;

/// Delay before the first refresh so the rest of the process can come up.
pub const STARTUP_DELAY_SECS: u64 = 5;

/// Upper bound for a single background refresh cycle (15 minutes).
pub const REFRESH_DEADLINE_SECS: u64 = 900;

/// Refresh cycles slower than this are logged with `slow = true`.
pub const SLOW_BUILD_THRESHOLD_MS: u64 = 30_000;

/// Event bus capacity for refresher events.
pub const EVENT_BUS_CAPACITY: usize = 64;

// =============================================================================
// WEBDAV
// =============================================================================

/// Per-request timeout. Storage is expected to be on the same network.
pub const REQUEST_TIMEOUT_SECS: u64 = 3;

/// Requests slower than this are logged with `slow = true`.
pub const SLOW_REQUEST_THRESHOLD_MS: u64 = 1_000;

/// Number of note bodies fetched concurrently during a build.
pub const FETCH_CONCURRENCY: usize = 4;

/// Subdirectory of the notes root holding daily notes.
pub const DAILY_SUBDIR: &str = "daily";

// =============================================================================
// NOTES
// =============================================================================

/// Title used when a note has no `#+TITLE:` directive.
pub const DEFAULT_NOTE_TITLE: &str = "Untitled Note";

/// Prefix of synthetic link-graph ids for daily notes.
pub const DAILY_ID_PREFIX: &str = "daily:";

/// Externally-facing base path for rendered note links.
pub const PUBLIC_NOTE_BASE_PATH: &str = "/note";

/// Base path for note links in authenticated views (journal, index).
pub const INTERNAL_NOTE_BASE_PATH: &str = "/zk/note";

/// Base path for daily-note pages in authenticated views.
pub const JOURNAL_BASE_PATH: &str = "/zk/journal";

/// CSS class added to public links whose target is not public.
pub const RESTRICTED_LINK_CLASS: &str = "restricted-link";

// =============================================================================
// JOURNAL PREVIEW
// =============================================================================

/// Maximum number of paragraphs in a journal preview.
pub const PREVIEW_MAX_PARAGRAPHS: usize = 2;

/// Maximum characters in a journal preview before truncation.
pub const PREVIEW_MAX_CHARS: usize = 480;

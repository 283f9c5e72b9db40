//! Structured logging schema and field name constants.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Refresh cycle failed, cache left at previous snapshot |
//! | WARN  | Per-file skip, transient remote failure, slow build |
//! | INFO  | Lifecycle events (refresher start/stop), build completions |
//! | DEBUG | Requests issued, resolver hits and misses |
//! | TRACE | Per-entry iteration (listing entries, extracted links) |
//!
//! Access directive values are never logged, only the derived flag.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "zk", "webdav"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "resolver", "link_index", "journal_index", "refresher"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "propfind", "fetch", "resolve", "build"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID or synthetic daily id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Filename within the notes directory.
pub const FILENAME: &str = "filename";

/// Remote URL of a request.
pub const URL: &str = "url";

/// HTTP status of a remote response.
pub const STATUS: &str = "status";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entries returned by a listing or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of files skipped during a build.
pub const SKIPPED: &str = "skipped";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";

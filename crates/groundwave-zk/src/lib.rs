//! # groundwave-zk
//!
//! Zettelkasten synchronization and link-graph cache for Groundwave.
//!
//! This crate provides:
//! - Org-mode extraction and HTML rendering
//! - Id to filename resolution with a write-through map
//! - Link graph, journal, and timeline snapshots built from a WebDAV
//!   directory and published atomically
//! - A background refresher with broadcast events
//! - Note rendering with restricted-link annotation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use groundwave_core::{CancellationToken, ZkConfig};
//! use groundwave_zk::{ZkCache, ZkRefresher};
//!
//! let config = ZkConfig::from_env()?;
//! let cache = Arc::new(ZkCache::from_config(config)?);
//!
//! // Keep snapshots fresh in the background
//! let handle = ZkRefresher::new(cache.clone()).start();
//!
//! let backlinks = cache.get_backlinks("33333333-3333-3333-3333-333333333333").await?;
//! let note = cache
//!     .render_note("22222222-2222-2222-2222-222222222222", "/note", &CancellationToken::new())
//!     .await?;
//!
//! handle.shutdown().await?;
//! ```

pub mod cache;
pub mod journal_index;
pub mod link_index;
pub mod org;
pub mod refresher;
pub mod renderer;
pub mod resolver;
pub mod test_fixtures;
pub mod timeline_index;

mod scan;

pub use cache::{RefreshReport, ZkCache};
pub use journal_index::JournalSnapshot;
pub use link_index::LinkSnapshot;
pub use refresher::{RefreshEvent, RefresherHandle, ZkRefresher};
pub use resolver::IdResolver;
pub use timeline_index::TimelineSnapshot;

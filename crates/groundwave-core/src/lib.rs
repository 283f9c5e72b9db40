//! # groundwave-core
//!
//! Core types, configuration, and abstractions for the Groundwave
//! Zettelkasten cache.
//!
//! This crate provides the error taxonomy, produced note types, and the
//! [`RemoteDirectory`] seam that the WebDAV client and the index builders
//! meet at.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod note_id;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::ZkConfig;
pub use error::{Error, Result};
pub use models::*;
pub use note_id::{canonical_note_id, is_note_id, parse_note_id};
pub use traits::*;

pub use tokio_util::sync::CancellationToken;

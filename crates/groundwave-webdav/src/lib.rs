//! # groundwave-webdav
//!
//! Read-only WebDAV access to the notes directory: depth-1 PROPFIND
//! listings and GET of file bodies, with optional Basic auth and a bounded
//! per-request timeout. Responses are not cached here.

pub mod client;
pub mod propfind;

pub use client::WebDavClient;
pub use propfind::parse_multistatus;

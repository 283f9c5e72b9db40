//! Core traits for remote note storage.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{RemoteEntry, Result};

/// Read-only access to a directory of note files.
///
/// Implemented by the WebDAV client and by in-memory fixtures. Every call
/// takes a cancellation token; a cancelled call returns
/// [`Error::Cancelled`](crate::Error::Cancelled).
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// List the immediate members of the directory at `url`.
    ///
    /// A directory that does not exist yields an empty listing, not an error.
    /// The directory's own entry is not included.
    async fn list_directory(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RemoteEntry>>;

    /// Fetch the raw body of the file at `url`.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>>;
}

//! Concurrent body fetching shared by the index builders.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use groundwave_core::{Error, RemoteDirectory, Result};

/// Fetch every `(url, item)` body with at most `concurrency` requests in
/// flight. Results come back in input order, so output built from them
/// matches a sequential scan.
pub(crate) async fn fetch_in_order<T>(
    source: &dyn RemoteDirectory,
    work: Vec<(String, T)>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Vec<(T, Result<Vec<u8>>)>
where
    T: Send,
{
    stream::iter(work)
        .map(|(url, item)| async move {
            let body = source.fetch(&url, cancel).await;
            (item, body)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Log a per-file skip. Cancellations are not logged.
pub(crate) fn warn_skip(component: &str, filename: &str, error: &Error) {
    if matches!(error, Error::Cancelled(_)) {
        return;
    }
    warn!(
        subsystem = "zk",
        component,
        filename,
        error = %error,
        "Skipping note"
    );
}

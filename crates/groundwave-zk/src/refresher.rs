//! Background refresh loop.
//!
//! Waits `startup_delay`, then runs [`ZkCache::refresh_all`] every
//! `interval` until shut down. Each cycle runs under its own child
//! cancellation token and is bounded by `deadline`; a cycle that overruns
//! is cancelled and publishes nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use groundwave_core::defaults::EVENT_BUS_CAPACITY;
use groundwave_core::{Error, Result};

use crate::cache::{RefreshReport, ZkCache};

/// Event emitted by the refresher.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    /// Refresher started.
    RefresherStarted,
    /// A refresh cycle began.
    RefreshStarted,
    /// A refresh cycle published new snapshots.
    RefreshCompleted { report: RefreshReport },
    /// A refresh cycle failed; previous snapshots stay published.
    RefreshFailed { error: String },
    /// Refresher stopped.
    RefresherStopped,
}

/// Handle for controlling a running refresher.
pub struct RefresherHandle {
    cancel: CancellationToken,
    event_rx: broadcast::Receiver<RefreshEvent>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Signal the refresher to stop and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Refresher task failed: {}", e)))
    }

    /// Get a receiver for refresher events.
    pub fn events(&self) -> broadcast::Receiver<RefreshEvent> {
        self.event_rx.resubscribe()
    }
}

/// Periodic driver for a [`ZkCache`].
pub struct ZkRefresher {
    cache: Arc<ZkCache>,
    interval: Duration,
    startup_delay: Duration,
    deadline: Duration,
    event_tx: broadcast::Sender<RefreshEvent>,
}

impl ZkRefresher {
    /// Timing comes from the cache's configuration.
    pub fn new(cache: Arc<ZkCache>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let (interval, startup_delay, deadline) = {
            let config = cache.config();
            (
                config.refresh_interval,
                config.startup_delay,
                config.refresh_deadline,
            )
        };
        Self {
            cache,
            interval,
            startup_delay,
            deadline,
            event_tx,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Start the refresher and return a handle for control.
    pub fn start(self) -> RefresherHandle {
        let cancel = CancellationToken::new();
        let event_rx = self.event_tx.subscribe();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(token).await;
        });
        RefresherHandle {
            cancel,
            event_rx,
            task,
        }
    }

    #[instrument(skip_all, fields(subsystem = "zk", component = "refresher"))]
    async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            startup_delay_secs = self.startup_delay.as_secs(),
            "Refresher started"
        );
        let _ = self.event_tx.send(RefreshEvent::RefresherStarted);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = sleep(self.startup_delay) => {
                loop {
                    self.cycle(&cancel).await;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = sleep(self.interval) => {}
                    }
                }
            }
        }

        let _ = self.event_tx.send(RefreshEvent::RefresherStopped);
        info!("Refresher stopped");
    }

    async fn cycle(&self, cancel: &CancellationToken) {
        let _ = self.event_tx.send(RefreshEvent::RefreshStarted);
        let cycle_token = cancel.child_token();

        let outcome = match timeout(self.deadline, self.cache.refresh_all(&cycle_token)).await {
            Ok(result) => result,
            Err(_) => {
                cycle_token.cancel();
                Err(Error::Cancelled(format!(
                    "refresh exceeded deadline of {}s",
                    self.deadline.as_secs()
                )))
            }
        };

        match outcome {
            Ok(report) => {
                let _ = self.event_tx.send(RefreshEvent::RefreshCompleted { report });
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    info!("Refresh interrupted by shutdown");
                } else if e.is_transient() {
                    warn!(error = %e, "Refresh failed, keeping previous snapshots");
                } else {
                    error!(error = %e, "Refresh failed, keeping previous snapshots");
                }
                let _ = self.event_tx.send(RefreshEvent::RefreshFailed {
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwave_core::ZkConfig;

    use crate::test_fixtures::{note_body, MemoryDirectory};

    const A: &str = "22222222-2222-2222-2222-222222222222";

    fn setup() -> (MemoryDirectory, Arc<ZkCache>) {
        let config = ZkConfig::new("https://host/zk/index.org").unwrap();
        let dir = MemoryDirectory::new(&config);
        dir.add_note("a.org", &note_body(A, "A", ""));
        let cache = Arc::new(ZkCache::new(Arc::new(dir.clone()), config));
        (dir, cache)
    }

    async fn next_completed(rx: &mut broadcast::Receiver<RefreshEvent>) -> RefreshEvent {
        loop {
            let event = rx.recv().await.unwrap();
            if matches!(
                event,
                RefreshEvent::RefreshCompleted { .. } | RefreshEvent::RefreshFailed { .. }
            ) {
                return event;
            }
        }
    }

    #[test]
    fn test_defaults_follow_config() {
        let config = ZkConfig::new("https://host/zk/index.org")
            .unwrap()
            .with_refresh_interval(Duration::from_secs(60));
        let dir = MemoryDirectory::new(&config);
        let refresher = ZkRefresher::new(Arc::new(ZkCache::new(Arc::new(dir), config)));
        assert_eq!(refresher.interval, Duration::from_secs(60));
        assert_eq!(refresher.startup_delay, Duration::from_secs(5));
        assert_eq!(refresher.deadline, Duration::from_secs(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_startup_delay() {
        let (dir, cache) = setup();
        let handle = ZkRefresher::new(cache.clone())
            .with_startup_delay(Duration::from_secs(5))
            .start();
        let mut events = handle.events();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(dir.list_count(), 0);

        let event = next_completed(&mut events).await;
        assert!(matches!(event, RefreshEvent::RefreshCompleted { .. }));
        assert!(cache.last_link_build_at().await.is_some());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeats_every_interval() {
        let (dir, cache) = setup();
        let handle = ZkRefresher::new(cache)
            .with_startup_delay(Duration::ZERO)
            .with_interval(Duration::from_secs(600))
            .start();
        let mut events = handle.events();

        next_completed(&mut events).await;
        next_completed(&mut events).await;
        assert_eq!(dir.list_count(), 4);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_startup_delay() {
        let (dir, cache) = setup();
        let handle = ZkRefresher::new(cache).start();
        let mut events = handle.events();
        handle.shutdown().await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), RefreshEvent::RefresherStarted));
        assert!(matches!(events.recv().await.unwrap(), RefreshEvent::RefresherStopped));
        assert_eq!(dir.list_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_slow_cycle() {
        let config = ZkConfig::new("https://host/zk/index.org").unwrap();
        let dir = MemoryDirectory::new(&config).with_latency(Duration::from_secs(10));
        dir.add_note("a.org", &note_body(A, "A", ""));
        let cache = Arc::new(ZkCache::new(Arc::new(dir), config));
        let handle = ZkRefresher::new(cache.clone())
            .with_startup_delay(Duration::ZERO)
            .with_deadline(Duration::from_secs(15))
            .start();
        let mut events = handle.events();

        let event = next_completed(&mut events).await;
        assert!(matches!(event, RefreshEvent::RefreshFailed { .. }));
        assert!(cache.links_snapshot().await.is_none());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_reported() {
        let (dir, cache) = setup();
        dir.fail_listing("https://host/zk/");
        let handle = ZkRefresher::new(cache)
            .with_startup_delay(Duration::ZERO)
            .start();
        let mut events = handle.events();

        match next_completed(&mut events).await {
            RefreshEvent::RefreshFailed { error } => assert!(error.contains("Build error")),
            other => panic!("unexpected event: {:?}", other),
        }
        handle.shutdown().await.unwrap();
    }
}

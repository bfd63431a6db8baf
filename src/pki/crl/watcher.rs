use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::store::RevocationStore;

/// Default polling interval for the CRL file (1 minute)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Result of a single poll of the CRL file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The file could not be stat'ed; polling continues on the next tick.
    StatFailed,
    /// The file is not newer than the published snapshot.
    Unchanged,
    /// A newer file was found and published.
    Reloaded,
    /// A newer file was found but could not be loaded.
    ReloadFailed,
}

/// Polls the modification time of the CRL file and reloads the store when it advances.
#[derive(Debug, Clone)]
pub struct CrlWatcher {
    store: Arc<RevocationStore>,
    path: PathBuf,
    poll_interval: Duration,
}

impl CrlWatcher {
    pub fn new(store: Arc<RevocationStore>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            path: path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the polling interval. Zero is clamped to one millisecond.
    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Check the file once and reload the store if the file is strictly newer
    /// than the published snapshot.
    pub async fn poll_once(&self) -> PollOutcome {
        let modified = match tokio::fs::metadata(&self.path)
            .await
            .and_then(|metadata| metadata.modified())
        {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Error accessing CRL file");
                return PollOutcome::StatFailed;
            }
        };

        // Nothing published yet: any readable file is worth a reload attempt.
        let is_newer = self
            .store
            .last_modified()
            .is_none_or(|baseline| modified > baseline);

        if !is_newer {
            return PollOutcome::Unchanged;
        }

        debug!(path = %self.path.display(), "CRL file changed, reloading");
        match self.store.reload(&self.path).await {
            Ok(_) => PollOutcome::Reloaded,
            Err(_) => PollOutcome::ReloadFailed,
        }
    }

    /// Start the polling loop in a background task.
    ///
    /// The loop ends when `true` is sent on `shutdown` or the sender is
    /// dropped; await the returned handle to observe the stop.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        info!(
            path = %self.path.display(),
            interval_secs = self.poll_interval.as_secs_f64(),
            "Starting CRL file watcher"
        );

        tokio::spawn(async move {
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await; // First tick completes immediately

            loop {
                if *shutdown.borrow() {
                    break;
                }

                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = self.poll_once().await;
                        debug!(?outcome, "CRL poll finished");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            info!(path = %self.path.display(), "CRL file watcher stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::TempDir;

    const ISSUER_A: &str = include_str!("../../../test_data/crl/issuer_a.pem");
    const ISSUER_B: &str = include_str!("../../../test_data/crl/issuer_b.pem");

    fn set_mtime(path: &Path, mtime: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    fn setup(content: &str) -> (TempDir, PathBuf, Arc<RevocationStore>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crl.pem");
        std::fs::write(&path, content).unwrap();
        (dir, path, Arc::new(RevocationStore::default()))
    }

    #[tokio::test]
    async fn test_first_poll_loads_when_nothing_published() {
        let (_dir, path, store) = setup(ISSUER_A);
        let watcher = CrlWatcher::new(store.clone(), &path);

        assert_eq!(watcher.poll_once().await, PollOutcome::Reloaded);
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn test_unchanged_file_is_not_reloaded() {
        let (_dir, path, store) = setup(ISSUER_A);
        let watcher = CrlWatcher::new(store.clone(), &path);
        let published = store.reload(&path).await.unwrap();

        assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);
        assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);
        assert!(Arc::ptr_eq(&published, &store.current().unwrap()));
    }

    #[tokio::test]
    async fn test_advanced_mtime_triggers_exactly_one_reload() {
        let (_dir, path, store) = setup(ISSUER_A);
        let watcher = CrlWatcher::new(store.clone(), &path);
        let published = store.reload(&path).await.unwrap();

        std::fs::write(&path, ISSUER_B).unwrap();
        set_mtime(&path, published.source_modified() + Duration::from_secs(5));

        assert_eq!(watcher.poll_once().await, PollOutcome::Reloaded);
        assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);

        let current = store.current().unwrap();
        assert!(!Arc::ptr_eq(&published, &current));
        assert_eq!(current.len(), 2);
    }

    #[tokio::test]
    async fn test_equal_mtime_does_not_reload() {
        let (_dir, path, store) = setup(ISSUER_A);
        let watcher = CrlWatcher::new(store.clone(), &path);
        let published = store.reload(&path).await.unwrap();

        std::fs::write(&path, ISSUER_B).unwrap();
        set_mtime(&path, published.source_modified());

        assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped() {
        let (dir, path, store) = setup(ISSUER_A);
        store.reload(&path).await.unwrap();
        let watcher = CrlWatcher::new(store.clone(), dir.path().join("gone.pem"));

        assert_eq!(watcher.poll_once().await, PollOutcome::StatFailed);
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_reload_is_retried() {
        let (_dir, path, store) = setup(ISSUER_A);
        let watcher = CrlWatcher::new(store.clone(), &path);
        let published = store.reload(&path).await.unwrap();

        std::fs::write(&path, "-----BEGIN X509 CRL-----\nMIIB\n-----END X509 CRL-----\n").unwrap();
        let newer = published.source_modified() + Duration::from_secs(5);
        set_mtime(&path, newer);

        assert_eq!(watcher.poll_once().await, PollOutcome::ReloadFailed);
        assert_eq!(watcher.poll_once().await, PollOutcome::ReloadFailed);
        assert!(Arc::ptr_eq(&published, &store.current().unwrap()));

        std::fs::write(&path, ISSUER_B).unwrap();
        set_mtime(&path, newer);

        assert_eq!(watcher.poll_once().await, PollOutcome::Reloaded);
        assert!(store.current().unwrap().is_revoked(
            &crate::pki::crl::SerialNumber::from_bytes_be(&[0x7F])
        ));
    }

    #[tokio::test]
    async fn test_spawned_watcher_reloads_and_stops() {
        let (_dir, path, store) = setup(ISSUER_A);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = CrlWatcher::new(store.clone(), &path)
            .with_interval(Duration::from_millis(20))
            .spawn(shutdown_rx);

        let loaded = tokio::time::timeout(Duration::from_secs(5), async {
            while !store.is_loaded() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(loaded.is_ok());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_watcher() {
        let (_dir, path, store) = setup(ISSUER_A);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = CrlWatcher::new(store, &path)
            .with_interval(Duration::from_secs(3600))
            .spawn(shutdown_rx);

        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use super::errors::{CrlError, CrlResult};
use super::parser::parse_crl_bundle;
use super::types::Snapshot;

/// Upper bound on the CRL file size read into memory (16 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 16 * 1024 * 1024;

/// Holds the currently published revocation snapshot.
///
/// Readers get the snapshot through a wait-free load and keep it alive through
/// their own `Arc`, so a concurrent reload never blocks them and never exposes
/// a half-built set.
#[derive(Debug)]
pub struct RevocationStore {
    current: ArcSwapOption<Snapshot>,
    max_file_bytes: u64,
}

impl Default for RevocationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl RevocationStore {
    /// Create an empty store. Nothing is published until the first successful reload.
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            max_file_bytes,
        }
    }

    /// The published snapshot, or `None` if no reload ever succeeded.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Modification time recorded by the current snapshot
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.current
            .load()
            .as_ref()
            .map(|snapshot| snapshot.source_modified())
    }

    /// Read, parse and publish the CRL bundle at `path`.
    ///
    /// On any failure the previously published snapshot stays in place.
    pub async fn reload(&self, path: impl AsRef<Path>) -> CrlResult<Arc<Snapshot>> {
        let path = path.as_ref();

        match self.build_snapshot(path).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.current.store(Some(Arc::clone(&snapshot)));
                info!(
                    path = %path.display(),
                    revoked = snapshot.len(),
                    crls = snapshot.crl_count(),
                    "CRL file loaded successfully"
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load CRL file");
                Err(e)
            }
        }
    }

    async fn build_snapshot(&self, path: &Path) -> CrlResult<Snapshot> {
        let data = self.read_bounded(path).await?;
        let bundle = parse_crl_bundle(&data)?;

        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|metadata| metadata.modified())
            .map_err(|e| CrlError::unreadable(path, e))?;

        Ok(Snapshot::new(bundle.serials, modified, bundle.blocks))
    }

    async fn read_bounded(&self, path: &Path) -> CrlResult<Vec<u8>> {
        let file = File::open(path)
            .await
            .map_err(|e| CrlError::unreadable(path, e))?;

        let mut data = Vec::new();
        file.take(self.max_file_bytes.saturating_add(1))
            .read_to_end(&mut data)
            .await
            .map_err(|e| CrlError::unreadable(path, e))?;

        if data.len() as u64 > self.max_file_bytes {
            return Err(CrlError::TooLarge {
                path: path.to_path_buf(),
                limit: self.max_file_bytes,
            });
        }

        Ok(data)
    }
}

//! Request-scoped scratch space for temporary artifacts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// When a workspace's files are deleted after the request finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Delete now; used on every failure path
    Immediate,
    /// Delete after a grace period so a just-issued download URL stays
    /// fetchable while the response is in flight
    Deferred(Duration),
}

/// A per-request temp directory; every artifact lives inside it.
///
/// Dropping the workspace without calling [`TempWorkspace::release`] still
/// removes the directory.
#[derive(Debug)]
pub struct TempWorkspace {
    request_id: String,
    dir: TempDir,
    artifacts: Vec<PathBuf>,
}

impl TempWorkspace {
    /// Create `req-<uuid>-XXXX` under `base`
    pub fn create(base: &Path) -> Result<Self> {
        std::fs::create_dir_all(base)?;
        let request_id = Uuid::new_v4().to_string();
        let dir = tempfile::Builder::new()
            .prefix(&format!("req-{}-", request_id))
            .tempdir_in(base)?;

        debug!("Created workspace {}", dir.path().display());
        Ok(Self {
            request_id,
            dir,
            artifacts: Vec::new(),
        })
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve and register a path for a new artifact
    pub fn artifact_path(&mut self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        self.register(path.clone());
        path
    }

    /// Register a file created by a collaborator (e.g. transcoder output)
    pub fn register(&mut self, path: PathBuf) {
        if !self.artifacts.contains(&path) {
            self.artifacts.push(path);
        }
    }

    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Delete registered artifacts and the directory according to `policy`
    pub fn release(self, policy: CleanupPolicy) {
        match policy {
            CleanupPolicy::Immediate => self.cleanup(),
            CleanupPolicy::Deferred(grace) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        tokio::time::sleep(grace).await;
                        self.cleanup();
                    });
                }
                Err(_) => self.cleanup(),
            },
        }
    }

    fn cleanup(self) {
        let Self {
            request_id,
            dir,
            artifacts,
        } = self;

        // Artifacts registered outside the directory are removed one by one
        for path in artifacts.iter().filter(|p| !p.starts_with(dir.path())) {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove temp file {}: {}", path.display(), e);
                }
            }
        }

        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(
                "🧹 Cleaned up workspace for request {} ({} artifacts)",
                request_id,
                artifacts.len()
            ),
            Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
        }
    }
}

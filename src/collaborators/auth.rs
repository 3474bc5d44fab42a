//! Authentication manager interface and filesystem-backed implementation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CollabError;

/// Authentication manager collaborator.
///
/// Configured once with the profile's auth directory; key material handling
/// lives entirely behind this trait.
#[async_trait]
pub trait AuthManager: Send + Sync + 'static {
    /// Prepares the manager to serve from `dir`.
    async fn configure(&self, dir: &Path) -> Result<(), CollabError>;

    /// Tears the manager down. Default: nothing to release.
    async fn stop(&self) -> Result<(), CollabError> {
        Ok(())
    }
}

/// Embedded auth manager keeping its state under a directory on disk.
///
/// `configure` creates the directory if missing and remembers it;
/// reconfiguring with the same directory is a no-op.
#[derive(Debug, Default)]
pub struct FsAuth {
    dir: Mutex<Option<PathBuf>>,
}

impl FsAuth {
    /// Creates an unconfigured manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configured directory, if any.
    pub fn dir(&self) -> Option<PathBuf> {
        self.dir.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl AuthManager for FsAuth {
    async fn configure(&self, dir: &Path) -> Result<(), CollabError> {
        if !dir.is_dir() {
            std::fs::create_dir_all(dir)?;
            log::debug!("auth dir created: {}", dir.display());
        }
        let mut cur = self.dir.lock().unwrap_or_else(|p| p.into_inner());
        *cur = Some(dir.to_path_buf());
        log::info!("auth manager ready: {}", dir.display());
        Ok(())
    }
}

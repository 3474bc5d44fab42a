//! Console interface and the embedded session-tracking console.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::ConsoleConfig;
use crate::error::CollabError;

/// Interactive console collaborator.
#[async_trait]
pub trait Console: Send + Sync + 'static {
    /// Applies the console configuration.
    async fn configure(&self, cfg: &ConsoleConfig) -> Result<(), CollabError>;

    /// Closes all sessions and stops accepting new ones. Default: nothing
    /// to release.
    async fn stop(&self) -> Result<(), CollabError> {
        Ok(())
    }
}

/// Embedded console: tracks sessions by random id, no transport attached.
#[derive(Debug, Default)]
pub struct LocalConsole {
    cfg: Mutex<Option<ConsoleConfig>>,
    sessions: Mutex<Vec<Uuid>>,
}

impl LocalConsole {
    /// Creates an unconfigured console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session and returns its id; fails while unconfigured or
    /// disabled.
    pub fn open_session(&self) -> Result<Uuid, CollabError> {
        let cfg = self.cfg.lock().unwrap_or_else(|p| p.into_inner());
        match cfg.as_ref() {
            Some(c) if c.enable => {
                let id = Uuid::new_v4();
                self.sessions
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .push(id);
                log::debug!("console session {id} opened");
                Ok(id)
            }
            Some(_) => Err(CollabError::Config {
                reason: "console is disabled".to_string(),
            }),
            None => Err(CollabError::Config {
                reason: "console not configured".to_string(),
            }),
        }
    }

    /// Returns the number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[async_trait]
impl Console for LocalConsole {
    async fn configure(&self, cfg: &ConsoleConfig) -> Result<(), CollabError> {
        let mut cur = self.cfg.lock().unwrap_or_else(|p| p.into_inner());
        *cur = Some(cfg.clone());
        if cfg.enable {
            log::info!("console ready: {}:{}", cfg.addr, cfg.port);
        } else {
            log::warn!("console is disabled");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        if !sessions.is_empty() {
            log::info!("console closing {} session(s)", sessions.len());
        }
        sessions.clear();
        Ok(())
    }
}

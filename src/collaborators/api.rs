//! Api server interface, request handlers, and the embedded in-process
//! implementation with a mount table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::error::CollabError;

/// A mounted request surface.
///
/// Deliberately transport-free: the runtime defines no wire protocol, it
/// only composes handlers onto the server.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Handles one request for `path` and returns the response body.
    async fn handle(&self, path: &str) -> Result<String, CollabError>;
}

/// Api server collaborator.
#[async_trait]
pub trait ApiServer: Send + Sync + 'static {
    /// Applies the server configuration.
    async fn configure(&self, cfg: &ServerConfig) -> Result<(), CollabError>;

    /// Mounts a handler under a path prefix. Longest prefix wins.
    fn mount(&self, path: &str, handler: Arc<dyn ApiHandler>);

    /// Begins serving.
    async fn start(&self) -> Result<(), CollabError>;

    /// Stops serving.
    async fn stop(&self) -> Result<(), CollabError>;
}

/// Embedded in-process api server.
///
/// Holds the configuration and a mount table; `dispatch` routes a path to
/// the mounted handler with the longest matching prefix. Serving state is a
/// flag, no sockets are opened.
#[derive(Default)]
pub struct LocalApi {
    cfg: Mutex<Option<ServerConfig>>,
    routes: Mutex<Vec<(String, Arc<dyn ApiHandler>)>>,
    running: AtomicBool,
}

impl LocalApi {
    /// Creates an unconfigured server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while the server is serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the mounted path prefixes, in mount order.
    pub fn routes(&self) -> Vec<String> {
        self.routes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Routes `path` to the handler with the longest matching prefix.
    pub async fn dispatch(&self, path: &str) -> Result<String, CollabError> {
        let handler = {
            let routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
            routes
                .iter()
                .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, h)| Arc::clone(h))
        };
        match handler {
            Some(h) => h.handle(path).await,
            None => Err(CollabError::Config {
                reason: format!("no handler mounted for {path}"),
            }),
        }
    }
}

#[async_trait]
impl ApiServer for LocalApi {
    async fn configure(&self, cfg: &ServerConfig) -> Result<(), CollabError> {
        if cfg.enable && cfg.addr.is_empty() {
            return Err(CollabError::Config {
                reason: "api enabled with an empty listen address".to_string(),
            });
        }
        let mut cur = self.cfg.lock().unwrap_or_else(|p| p.into_inner());
        *cur = Some(cfg.clone());
        log::info!("api server ready: {}:{}", cfg.addr, cfg.port);
        Ok(())
    }

    fn mount(&self, path: &str, handler: Arc<dyn ApiHandler>) {
        let mut routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
        log::debug!("api mount {path}");
        routes.push((path.to_string(), handler));
    }

    async fn start(&self) -> Result<(), CollabError> {
        let cfg = self
            .cfg
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or_else(|| CollabError::Start {
                reason: "api server not configured".to_string(),
            })?;
        if !cfg.enable {
            log::warn!("api server is disabled");
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);
        log::info!("api server serving on {}:{}", cfg.addr, cfg.port);
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        self.running.store(false, Ordering::SeqCst);
        log::info!("api server stopped");
        Ok(())
    }
}

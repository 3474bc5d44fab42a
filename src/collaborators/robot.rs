//! Robot controller interface and the embedded local robot.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::collaborators::ApiHandler;
use crate::config::{ApiSurfaceConfig, MasterConfig};
use crate::error::CollabError;

/// Robot controller collaborator.
#[async_trait]
pub trait Robot: Send + Sync + 'static {
    /// Applies the master configuration and the api-surface configuration.
    async fn configure(
        &self,
        master: &MasterConfig,
        api: &ApiSurfaceConfig,
    ) -> Result<(), CollabError>;

    /// Starts the robot's work loop.
    async fn start(&self) -> Result<(), CollabError>;

    /// Stops the robot. Default: nothing to release.
    async fn stop(&self) -> Result<(), CollabError> {
        Ok(())
    }

    /// Returns the robot's request surface, mountable on the api server.
    fn surface(&self) -> Arc<dyn ApiHandler>;
}

#[derive(Debug, Clone, Default)]
struct RobotState {
    name: String,
    surface: Option<ApiSurfaceConfig>,
    running: bool,
}

/// Embedded robot: device wiring replaced by a status surface.
///
/// Configuring a robot with an empty name is rejected; the surface reports
/// the robot's name and whether it is running.
#[derive(Default)]
pub struct LocalRobot {
    state: Arc<Mutex<RobotState>>,
}

impl LocalRobot {
    /// Creates an unconfigured robot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configured robot name, empty if unconfigured.
    pub fn name(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .name
            .clone()
    }

    /// Returns true while the robot's work loop runs.
    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).running
    }

    /// Returns the applied api-surface settings, if configured.
    pub fn surface_config(&self) -> Option<ApiSurfaceConfig> {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .surface
            .clone()
    }
}

struct Surface {
    state: Arc<Mutex<RobotState>>,
}

#[async_trait]
impl ApiHandler for Surface {
    async fn handle(&self, path: &str) -> Result<String, CollabError> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner()).clone();
        if state.surface.as_ref().is_some_and(|s| s.debug) {
            log::debug!("robot {} request {path}", state.name);
        }
        let status = if state.running { "running" } else { "idle" };
        Ok(format!("robot {} {status} {path}", state.name))
    }
}

#[async_trait]
impl Robot for LocalRobot {
    async fn configure(
        &self,
        master: &MasterConfig,
        api: &ApiSurfaceConfig,
    ) -> Result<(), CollabError> {
        if master.name.is_empty() {
            return Err(CollabError::Config {
                reason: "robot name is empty".to_string(),
            });
        }
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.name = master.name.clone();
        state.surface = Some(api.clone());
        log::info!("robot {} ready", master.name);
        Ok(())
    }

    async fn start(&self) -> Result<(), CollabError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.name.is_empty() {
            return Err(CollabError::Start {
                reason: "robot not configured".to_string(),
            });
        }
        state.running = true;
        log::info!("robot {} started", state.name);
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollabError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.running = false;
        if !state.name.is_empty() {
            log::info!("robot {} stopped", state.name);
        }
        Ok(())
    }

    fn surface(&self) -> Arc<dyn ApiHandler> {
        Arc::new(Surface {
            state: Arc::clone(&self.state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configure_then_start() {
        let robot = LocalRobot::new();
        let master = MasterConfig {
            name: "botA".to_string(),
        };
        robot
            .configure(&master, &ApiSurfaceConfig::default())
            .await
            .expect("configure");
        assert_eq!(robot.name(), "botA");

        robot.start().await.expect("start");
        assert!(robot.is_running());
        robot.stop().await.expect("stop");
        assert!(!robot.is_running());
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let robot = LocalRobot::new();
        let master = MasterConfig {
            name: String::new(),
        };
        let err = robot
            .configure(&master, &ApiSurfaceConfig::default())
            .await
            .expect_err("rejects empty name");
        assert_eq!(err.as_label(), "collab_config");
    }

    #[tokio::test]
    async fn test_start_before_configure_fails() {
        let robot = LocalRobot::new();
        assert!(robot.start().await.is_err());
    }

    #[tokio::test]
    async fn test_surface_reports_status() {
        let robot = LocalRobot::new();
        let master = MasterConfig {
            name: "botA".to_string(),
        };
        robot
            .configure(&master, &ApiSurfaceConfig::default())
            .await
            .expect("configure");
        let surface = robot.surface();

        assert_eq!(
            surface.handle("/status").await.expect("idle"),
            "robot botA idle /status"
        );
        robot.start().await.expect("start");
        assert_eq!(
            surface.handle("/status").await.expect("running"),
            "robot botA running /status"
        );
    }
}

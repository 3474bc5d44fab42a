//! Builder for constructing a [`Runtime`] with optional overrides.

use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::{
    ApiServer, AuthManager, Console, FsAuth, LocalApi, LocalConsole, LocalRobot, Robot,
};
use crate::config::{Config, Flags, Profile};
use crate::runtime::context::ExecContext;
use crate::runtime::core::{Collaborators, Runtime};
use crate::runtime::lock::DEFAULT_LOCK_TIMEOUT;

/// Builder for a [`Runtime`].
///
/// Starts wired with the embedded collaborators, the env-resolved profile
/// and flags, an empty configuration tree, a fresh root context, and the
/// default lock timeout; every piece can be replaced before `build`.
pub struct RuntimeBuilder {
    profile: Profile,
    config: Config,
    flags: Flags,
    context: ExecContext,
    lock_timeout: Duration,
    auth: Arc<dyn AuthManager>,
    robot: Arc<dyn Robot>,
    api: Arc<dyn ApiServer>,
    console: Arc<dyn Console>,
}

impl RuntimeBuilder {
    /// Creates a builder with all defaults.
    pub fn new() -> Self {
        Self {
            profile: Profile::default(),
            config: Config::new(),
            flags: Flags::from_env(),
            context: ExecContext::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            auth: Arc::new(FsAuth::new()),
            robot: Arc::new(LocalRobot::new()),
            api: Arc::new(LocalApi::new()),
            console: Arc::new(LocalConsole::new()),
        }
    }

    /// Sets the configuration profile.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Seeds the configuration tree consumed by `configure`.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the initial flags (normally resolved from the environment).
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the runtime's initial active context.
    pub fn with_context(mut self, context: ExecContext) -> Self {
        self.context = context;
        self
    }

    /// Sets the bounded-wait lock acquisition deadline.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Replaces the auth manager collaborator.
    pub fn with_auth(mut self, auth: Arc<dyn AuthManager>) -> Self {
        self.auth = auth;
        self
    }

    /// Replaces the robot collaborator.
    pub fn with_robot(mut self, robot: Arc<dyn Robot>) -> Self {
        self.robot = robot;
        self
    }

    /// Replaces the api server collaborator.
    pub fn with_api(mut self, api: Arc<dyn ApiServer>) -> Self {
        self.api = api;
        self
    }

    /// Replaces the console collaborator.
    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Builds the runtime: identity and lock created, state `Init`,
    /// registry slots empty until the first `init()`.
    pub fn build(self) -> Runtime {
        Runtime::from_builder(
            self.profile,
            self.config,
            self.flags,
            self.context,
            self.lock_timeout,
            Collaborators {
                auth: self.auth,
                robot: self.robot,
                api: self.api,
                console: self.console,
            },
        )
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

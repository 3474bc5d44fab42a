//! The runtime: one shared control-plane identity coordinating lock
//! ownership, context propagation, and the lifecycle state machine.
//!
//! ## Control flow
//! ```text
//! caller ──► lock() ───────────► LockGuard (explicit, releasable)
//!    │                               │
//!    ├─► reconcile(ctx) ◄── api handler / console session contexts
//!    │                               │
//!    └─► init() ──► configure(&guard) ──► start()/run() ──► stop()/halt()
//!          │               │
//!          │               ├─ merge defaults + profile files + flags
//!          │               ├─ auth → robot → api → console (first failure
//!          │               │   aborts, state stays init)
//!          │               ├─ mount robot surface when api flag is set
//!          │               └─ commit state: init → running
//!          └─ populate registry slots exactly once
//! ```
//!
//! `configure` is serialized by the lock invariant: it demands the guard of
//! the current owner token, so at most one configure proceeds at a time
//! while contenders block on `lock()` until its deadline. The registry and
//! snapshot are only mutated here; every later read assumes an immutable,
//! fully populated snapshot.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::collaborators::{ApiServer, AuthManager, Console, Robot};
use crate::config::{Config, Flags, Profile};
use crate::error::{CollabError, CoreError};
use crate::runtime::builder::RuntimeBuilder;
use crate::runtime::context::ExecContext;
use crate::runtime::lock::{CoreLock, Identity, LockGuard};
use crate::runtime::registry::{Registry, Slot, Snapshot};
use crate::runtime::state::{Lifecycle, LifecycleOp, Step};

/// The collaborator handles the builder hands over for the first `init`.
pub(crate) struct Collaborators {
    pub auth: Arc<dyn AuthManager>,
    pub robot: Arc<dyn Robot>,
    pub api: Arc<dyn ApiServer>,
    pub console: Arc<dyn Console>,
}

fn cell<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// The single mutable control-plane identity.
///
/// Construct through [`Runtime::builder`]; drive through the lifecycle
/// operations. All operations take `&self` and are safe to call from
/// independent concurrent call paths.
pub struct Runtime {
    identity: Identity,
    lock: CoreLock,
    state: Mutex<Lifecycle>,
    registry: Mutex<Registry>,
    pending: Mutex<Option<Collaborators>>,
    active: Mutex<ExecContext>,
    adopted: Mutex<Option<LockGuard>>,
    profile: Profile,
    config: Mutex<Config>,
    flags: Mutex<Flags>,
}

impl Runtime {
    /// Returns a builder wired with the embedded collaborators.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime with all defaults.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub(crate) fn from_builder(
        profile: Profile,
        config: Config,
        flags: Flags,
        context: ExecContext,
        lock_timeout: std::time::Duration,
        collaborators: Collaborators,
    ) -> Self {
        let identity = Identity::random();
        Self {
            identity,
            lock: CoreLock::new(identity, lock_timeout),
            state: Mutex::new(Lifecycle::Init),
            registry: Mutex::new(Registry::default()),
            pending: Mutex::new(Some(collaborators)),
            active: Mutex::new(context),
            adopted: Mutex::new(None),
            profile,
            config: Mutex::new(config),
            flags: Mutex::new(flags),
        }
    }

    // ---- identity & observation ----

    /// The identity naming this runtime instance.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Human-readable label.
    pub fn label(&self) -> String {
        format!("Runtime:{}", self.identity)
    }

    /// The currently active lifecycle state.
    pub fn state(&self) -> Lifecycle {
        *cell(&self.state)
    }

    /// The current owner token, if any. Non-blocking.
    pub fn lock_owner(&self) -> Option<crate::runtime::LockToken> {
        self.lock.owner()
    }

    /// Returns true while an owner token is recorded.
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// A clone of the runtime's active execution context.
    pub fn context(&self) -> ExecContext {
        cell(&self.active).clone()
    }

    /// The profile this runtime configures from.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    // ---- lock & context propagation ----

    /// Bounded-wait exclusive acquisition.
    ///
    /// On success the fresh token is attached to the active context and an
    /// explicit [`LockGuard`] is returned; dropping it releases ownership.
    /// On timeout nothing is mutated.
    pub async fn lock(&self) -> Result<LockGuard, CoreError> {
        let guard = self.lock.acquire().await?;
        let mut active = cell(&self.active);
        *active = active.with_token(guard.token());
        Ok(guard)
    }

    /// Reconciles an externally supplied context with current ownership.
    ///
    /// - `ctx` carries no token but the runtime is locked: the returned
    ///   context carries the current owner token (observation, not a
    ///   grant).
    /// - `ctx` carries a token but the runtime is unlocked: the runtime
    ///   attempts to adopt that ownership by acquiring its own lock; the
    ///   adopted guard is stashed and retrievable via
    ///   [`Runtime::take_adopted`]. On acquisition failure the owner view
    ///   is still updated to the incoming token and the error propagates.
    ///
    /// The runtime always adopts `ctx` as its new active context,
    /// cancellation included, regardless of the outcome. Idempotent for an
    /// already-reconciled context.
    pub async fn reconcile(&self, ctx: ExecContext) -> Result<ExecContext, CoreError> {
        let next = match (ctx.token(), self.lock.owner()) {
            (None, Some(token)) => ctx.with_token(token),
            (Some(token), None) => match self.lock.acquire().await {
                Ok(mut guard) => {
                    guard.rekey(token);
                    *cell(&self.adopted) = Some(guard);
                    log::debug!("ownership adopted from context: {token}");
                    ctx
                }
                Err(err) => {
                    self.lock.force_owner(token);
                    *cell(&self.active) = ctx;
                    return Err(err);
                }
            },
            (Some(token), Some(_)) => {
                // incoming token wins future validations
                self.lock.force_owner(token);
                ctx
            }
            (None, None) => ctx,
        };
        *cell(&self.active) = next.clone();
        Ok(next)
    }

    /// Takes the guard adopted by the last successful token-carrying
    /// reconcile, if any. The caller becomes responsible for releasing it.
    pub fn take_adopted(&self) -> Option<LockGuard> {
        cell(&self.adopted).take()
    }

    // ---- lifecycle ----

    /// Steps the state machine and commits the successor in one critical
    /// section. Racing operations observe the committed successor, never
    /// the pre-step state, so a `stop` racing a `halt` fails with the
    /// `Halted` sentinel instead of overwriting the terminal state.
    fn transition(&self, op: LifecycleOp) -> Result<Step, CoreError> {
        let mut state = cell(&self.state);
        let step = state.step(op)?;
        if let Step::Proceed(next) = step {
            *state = next;
        }
        Ok(step)
    }

    /// Populates empty collaborator registry slots exactly once.
    ///
    /// Safe to call repeatedly: once populated, further calls are no-ops.
    pub fn init(&self) -> Result<(), CoreError> {
        let state = self.state();
        match state.step(LifecycleOp::Init)? {
            Step::Noop => return Ok(()),
            Step::Proceed(_) => {}
        }
        let mut reg = cell(&self.registry);
        if reg.is_ready() {
            log::debug!("{self} already initialized");
            return Ok(());
        }
        if let Some(c) = cell(&self.pending).take() {
            log::info!("init auth manager");
            reg.auth.fill(c.auth);
            log::info!("init robot");
            reg.robot.fill(c.robot);
            log::info!("init api server");
            reg.api.fill(c.api);
            log::info!("init console");
            reg.console.fill(c.console);
        }
        Ok(())
    }

    /// Merges the configuration and wires all collaborators, promoting the
    /// runtime to `Running`.
    ///
    /// Requires the guard of the current owner token. Fails fast with
    /// [`CoreError::Canceled`] if the active context is already done. The
    /// collaborators are configured strictly in order auth, robot, api,
    /// console; the first failure aborts the rest and leaves the state at
    /// `Init`. When the api flag is set the robot's request surface is
    /// mounted onto the api server before the console is configured.
    pub async fn configure(&self, guard: &LockGuard) -> Result<(), CoreError> {
        if guard.token().issuer() != self.identity {
            return Err(CoreError::ForeignToken);
        }
        if self.lock.owner() != Some(guard.token()) {
            return Err(CoreError::NotLocked);
        }
        if self.context().is_done() {
            return Err(CoreError::Canceled);
        }
        // validated here for the fail-fast path, committed at the end
        if let Step::Noop = self.state().step(LifecycleOp::Configure)? {
            return Ok(());
        }

        log::info!("configure {self}");
        self.init()?;

        let (cfg, flags, auth_dir) = {
            let mut cfg = cell(&self.config);
            let mut flags = cell(&self.flags);
            cfg.set_defaults(Config::defaults());
            cfg.load(&self.profile)
                .map_err(|source| CoreError::Config { source })?;
            flags
                .parse(&mut cfg)
                .map_err(|source| CoreError::Config { source })?;
            let dir = cfg
                .get_str("auth", "dir")
                .unwrap_or_else(|| "auth".to_string());
            (cfg.clone(), flags.clone(), dir)
        };
        let master = cfg.master().map_err(|source| CoreError::Config { source })?;
        let surface_cfg = cfg
            .api_surface()
            .map_err(|source| CoreError::Config { source })?;
        let server_cfg = cfg.server().map_err(|source| CoreError::Config { source })?;
        let console_cfg = cfg
            .console()
            .map_err(|source| CoreError::Config { source })?;

        let (auth, robot, api, console) = {
            let reg = cell(&self.registry);
            (
                ready(&reg.auth, "auth")?,
                ready(&reg.robot, "robot")?,
                ready(&reg.api, "api")?,
                ready(&reg.console, "console")?,
            )
        };

        log::info!("configure auth manager");
        auth.configure(&self.profile.path(&auth_dir))
            .await
            .map_err(|source| CoreError::Configure {
                name: "auth",
                source,
            })?;

        log::info!("configure robot {}", master.name);
        robot
            .configure(&master, &surface_cfg)
            .await
            .map_err(|source| CoreError::Configure {
                name: "robot",
                source,
            })?;

        log::info!("configure api server");
        api.configure(&server_cfg)
            .await
            .map_err(|source| CoreError::Configure {
                name: "api",
                source,
            })?;
        if flags.api_enable {
            log::debug!("mount robot surface");
            api.mount("/", robot.surface());
        }

        log::info!("configure console");
        console
            .configure(&console_cfg)
            .await
            .map_err(|source| CoreError::Configure {
                name: "console",
                source,
            })?;

        cell(&self.registry).snapshot = Some(Snapshot {
            config: cfg,
            flags,
        });
        // re-stepped under the state lock: a racing transition is not
        // overwritten, it turns this commit into the sentinel error
        let next = match self.transition(LifecycleOp::Configure)? {
            Step::Proceed(next) => next,
            Step::Noop => return Ok(()),
        };
        log::info!("{self} is {next}");
        Ok(())
    }

    /// Begins serving: starts the robot, then the api server if enabled.
    ///
    /// A collaborator failure is returned to the caller but does not roll
    /// the state back; the machine stays `Running` awaiting an explicit
    /// `stop` or `halt`.
    pub async fn start(&self) -> Result<(), CoreError> {
        match self.transition(LifecycleOp::Start)? {
            Step::Noop => return Ok(()),
            Step::Proceed(_) => {}
        }
        self.start_serving().await
    }

    /// Starts serving and parks on the active context; on cancellation a
    /// graceful [`Runtime::stop`] follows.
    pub async fn run(&self) -> Result<(), CoreError> {
        match self.transition(LifecycleOp::Run)? {
            Step::Noop => return Ok(()),
            Step::Proceed(_) => {}
        }
        log::info!("run {self}");
        self.start_serving().await?;

        let ctx = self.context();
        ctx.done().await;
        log::info!("{self} shutdown requested");
        if self.state().is_terminal() {
            // halted while we were parked, teardown already happened
            return Ok(());
        }
        self.stop().await
    }

    /// Graceful shutdown: transitions to `Stopped`, then tears collaborators
    /// down in the inverse of the configuration order (console, api, robot,
    /// auth).
    ///
    /// The transition commits before teardown begins, so concurrent
    /// lifecycle calls observe `Stopped` immediately. Teardown attempts
    /// every collaborator; the first error is returned.
    pub async fn stop(&self) -> Result<(), CoreError> {
        let next = match self.transition(LifecycleOp::Stop)? {
            Step::Noop => return Ok(()),
            Step::Proceed(next) => next,
        };
        log::info!("stop {self}");
        let first = self.teardown().await;
        log::info!("{self} is {next}");
        match first {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Forced teardown: transitions to the terminal `Halted`, cancels the
    /// active context, tears everything down, and releases adopted
    /// ownership. A second halt is a no-op.
    ///
    /// `Halted` commits before teardown begins: a `stop` racing the
    /// teardown fails with the `Halted` sentinel instead of overwriting
    /// the terminal state.
    pub async fn halt(&self) -> Result<(), CoreError> {
        let next = match self.transition(LifecycleOp::Halt)? {
            Step::Noop => return Ok(()),
            Step::Proceed(next) => next,
        };
        log::warn!("halt {self}");
        self.context().cancel();
        let first = self.teardown().await;
        drop(self.take_adopted());
        log::info!("{self} is {next}");
        match first {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    async fn start_serving(&self) -> Result<(), CoreError> {
        let (robot, api, snapshot) = {
            let reg = cell(&self.registry);
            (
                ready(&reg.robot, "robot")?,
                ready(&reg.api, "api")?,
                reg.snapshot.clone(),
            )
        };
        robot.start().await.map_err(|source| CoreError::Collaborator {
            name: "robot",
            source,
        })?;
        let api_enabled = snapshot.map(|s| s.flags.api_enable).unwrap_or(false);
        if api_enabled {
            api.start().await.map_err(|source| CoreError::Collaborator {
                name: "api",
                source,
            })?;
        } else {
            log::warn!("api server is disabled");
        }
        Ok(())
    }

    /// Inverse-order teardown; logs every failure, returns the first.
    async fn teardown(&self) -> Option<CoreError> {
        let (auth, robot, api, console) = {
            let reg = cell(&self.registry);
            (
                reg.auth.get().cloned(),
                reg.robot.get().cloned(),
                reg.api.get().cloned(),
                reg.console.get().cloned(),
            )
        };
        let mut first: Option<CoreError> = None;
        let mut note = |name: &'static str, result: Result<(), CollabError>| {
            if let Err(source) = result {
                log::error!("{name} stop: {source}");
                if first.is_none() {
                    first = Some(CoreError::Collaborator { name, source });
                }
            }
        };

        if let Some(console) = console {
            note("console", console.stop().await);
        }
        if let Some(api) = api {
            note("api", api.stop().await);
        }
        if let Some(robot) = robot {
            note("robot", robot.stop().await);
        }
        if let Some(auth) = auth {
            note("auth", auth.stop().await);
        }
        first
    }

    // ---- registry read accessors ----

    /// The auth manager, once initialized.
    pub fn auth(&self) -> Option<Arc<dyn AuthManager>> {
        cell(&self.registry).auth.get().cloned()
    }

    /// The robot, once initialized.
    pub fn robot(&self) -> Option<Arc<dyn Robot>> {
        cell(&self.registry).robot.get().cloned()
    }

    /// The api server, once initialized.
    pub fn api(&self) -> Option<Arc<dyn ApiServer>> {
        cell(&self.registry).api.get().cloned()
    }

    /// The console, once initialized.
    pub fn console(&self) -> Option<Arc<dyn Console>> {
        cell(&self.registry).console.get().cloned()
    }

    /// The merged configuration snapshot, once configured.
    pub fn config(&self) -> Option<Config> {
        cell(&self.registry).snapshot.as_ref().map(|s| s.config.clone())
    }

    /// The parsed flags snapshot, once configured.
    pub fn flags(&self) -> Option<Flags> {
        cell(&self.registry).snapshot.as_ref().map(|s| s.flags.clone())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime:{}", self.identity)
    }
}

fn ready<T: ?Sized>(slot: &Slot<Arc<T>>, name: &'static str) -> Result<Arc<T>, CoreError> {
    slot.get().cloned().ok_or(CoreError::Configure {
        name,
        source: CollabError::Config {
            reason: "collaborator not initialized".to_string(),
        },
    })
}

//! # botvisor
//!
//! **botvisor** is the control-plane runtime for a robot master: a single
//! shared identity that enforces exclusive mutation rights through a
//! context-carried lock token and drives a lifecycle state machine wiring
//! together its collaborators (auth manager, robot, api server, console).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            ┌─────────────┐  ┌───────────────┐  ┌─────────────┐
//!            │  cli entry  │  │  api handler  │  │   console   │
//!            └──────┬──────┘  └───────┬───────┘  └──────┬──────┘
//!                   │ lock()          │ reconcile(ctx)  │
//!                   ▼                 ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime (control-plane identity)                                 │
//! │  - CoreLock (bounded-wait, token per acquisition)                 │
//! │  - ExecContext (cancellation + attached LockToken)                │
//! │  - Lifecycle (Init → Running → Stopped → Halted)                  │
//! │  - Registry (four once-filled collaborator slots + snapshot)      │
//! └──────┬──────────────┬───────────────┬───────────────┬────────────┘
//!        ▼              ▼               ▼               ▼
//!   ┌─────────┐    ┌─────────┐    ┌───────────┐    ┌─────────┐
//!   │  Auth   │    │  Robot  │    │    Api    │    │ Console │
//!   │ manager │    │         │──► │  (mount)  │    │         │
//!   └─────────┘    └─────────┘    └───────────┘    └─────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! lock() ──► LockGuard (released on every exit path via Drop)
//!
//! init()                populate registry slots exactly once
//! configure(&guard)     requires the owner token; checks cancellation;
//!                       merges defaults + profile files + flags;
//!                       auth → robot → api → console, first failure
//!                       aborts with state still Init;
//!                       mounts the robot surface when the api flag is set;
//!                       success commits Init → Running
//! start()/run()         begin serving; run() parks on the active context
//!                       and stops gracefully on cancellation
//! stop()                commits Stopped, then console → api → robot → auth
//! halt()                commits the terminal Halted, then forced teardown
//! ```
//!
//! Operations invoked from a state that forbids them fail with a fixed
//! sentinel ([`CoreError::InvalidOp`]): "not yet available", not fatal, and
//! callers may legitimately probe state this way.
//!
//! ## Example
//! ```rust
//! use botvisor::{Config, Lifecycle, Profile, Runtime};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tmp = std::env::temp_dir().join("botvisor-doc");
//!     let mut profile = Profile::new("doc");
//!     profile.config_dir = tmp.clone();
//!     profile.config_sys_dir = tmp.join("sys");
//!     profile.config_dist_dir = tmp.join("dist");
//!
//!     let rt = Runtime::builder().with_profile(profile).build();
//!
//!     let guard = rt.lock().await?;
//!     rt.init()?;
//!     rt.configure(&guard).await?;
//!     drop(guard);
//!     assert_eq!(rt.state(), Lifecycle::Running);
//!
//!     rt.start().await?;
//!     rt.stop().await?;
//!     rt.halt().await?;
//!     Ok(())
//! }
//! ```

mod collaborators;
mod config;
pub mod env;
mod error;
mod runtime;

// ---- Public re-exports ----

pub use collaborators::{
    ApiHandler, ApiServer, AuthManager, Console, FsAuth, LocalApi, LocalConsole, LocalRobot,
    Robot,
};
pub use config::{
    ApiSurfaceConfig, Config, ConsoleConfig, Flags, MasterConfig, Profile, ServerConfig,
};
pub use error::{CollabError, ConfigError, CoreError};
pub use runtime::{
    CoreLock, ExecContext, Identity, Lifecycle, LifecycleOp, LockGuard, LockToken, Runtime,
    RuntimeBuilder, Slot, DEFAULT_LOCK_TIMEOUT,
};

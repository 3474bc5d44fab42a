//! Error types used by the botvisor runtime and its collaborators.
//!
//! This module defines three error enums:
//!
//! - [`CoreError`] — errors raised by the runtime itself (lock acquisition,
//!   lifecycle sentinels, configuration promotion, cancellation).
//! - [`CollabError`] — errors raised by collaborator implementations
//!   (auth manager, robot, api server, console).
//! - [`ConfigError`] — errors raised while loading and merging the layered
//!   configuration files.
//!
//! All types provide `as_label()` for stable snake_case labels in logs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::runtime::{Lifecycle, LifecycleOp};

/// # Errors produced by the runtime core.
///
/// Lifecycle sentinels ([`CoreError::InvalidOp`]) signal "not available from
/// this state" rather than a fatal condition; callers may legitimately probe
/// runtime state through them. The core never retries or masks internally.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bounded-wait lock acquisition did not succeed before its deadline.
    ///
    /// Transient: the caller decides whether to retry.
    #[error("lock acquisition timed out after {timeout:?}")]
    LockTimeout {
        /// The acquisition deadline that elapsed.
        timeout: Duration,
    },

    /// A mutating operation required a lock token but the runtime holds none.
    #[error("runtime is not locked")]
    NotLocked,

    /// The presented lock token was issued by a different runtime.
    #[error("lock token was issued by another runtime")]
    ForeignToken,

    /// A lifecycle method was invoked while the current state forbids it.
    ///
    /// A fixed sentinel per (state, operation) pair.
    #[error("{op} is not permitted while {state}")]
    InvalidOp {
        /// The state the machine was in.
        state: Lifecycle,
        /// The operation that was refused.
        op: LifecycleOp,
    },

    /// Loading or merging the configuration failed during `configure`.
    ///
    /// Promotion to `Running` is blocked; collaborators are not attempted.
    #[error("load configuration: {source}")]
    Config {
        /// The underlying configuration error.
        #[source]
        source: ConfigError,
    },

    /// A collaborator's `configure` failed.
    ///
    /// Wraps the first failing collaborator's error; the remaining
    /// collaborators are not attempted and the state stays `Init`.
    #[error("configure {name}: {source}")]
    Configure {
        /// Which collaborator failed ("auth", "robot", "api", "console").
        name: &'static str,
        /// The collaborator's own error.
        #[source]
        source: CollabError,
    },

    /// A collaborator failed while starting or stopping.
    #[error("{name}: {source}")]
    Collaborator {
        /// Which collaborator failed.
        name: &'static str,
        /// The collaborator's own error.
        #[source]
        source: CollabError,
    },

    /// The active execution context was already done at the time of a
    /// mutating call. Returned before any mutation happens.
    #[error("context cancelled")]
    Canceled,
}

impl CoreError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CoreError::LockTimeout { .. } => "core_lock_timeout",
            CoreError::NotLocked => "core_not_locked",
            CoreError::ForeignToken => "core_foreign_token",
            CoreError::InvalidOp { .. } => "core_invalid_op",
            CoreError::Config { .. } => "core_config",
            CoreError::Configure { .. } => "core_configure",
            CoreError::Collaborator { .. } => "core_collaborator",
            CoreError::Canceled => "core_canceled",
        }
    }
}

/// # Errors produced by collaborator implementations.
///
/// The runtime wraps these into [`CoreError::Configure`] or
/// [`CoreError::Collaborator`] and never inspects them further.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CollabError {
    /// The supplied configuration was rejected.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong with it.
        reason: String,
    },

    /// Startup failed.
    #[error("startup failed: {reason}")]
    Start {
        /// The underlying failure.
        reason: String,
    },

    /// Shutdown failed.
    #[error("shutdown failed: {reason}")]
    Stop {
        /// The underlying failure.
        reason: String,
    },

    /// Filesystem or network failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CollabError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CollabError::Config { .. } => "collab_config",
            CollabError::Start { .. } => "collab_start",
            CollabError::Stop { .. } => "collab_stop",
            CollabError::Io(_) => "collab_io",
        }
    }
}

/// Errors raised while reading and merging layered configuration files.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration file exists but could not be read.
    #[error("{path}: {source}")]
    Read {
        /// The offending file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON or not an object.
    #[error("{path}: {source}")]
    Parse {
        /// The offending file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A section did not deserialize into its typed snapshot.
    #[error("section {section}: {source}")]
    Section {
        /// The section name.
        section: &'static str,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Section { .. } => "config_section",
        }
    }
}

//! Runtime core: identity, exclusive lock, context propagation, and the
//! lifecycle state machine.
//!
//! This module contains the control-plane runtime itself. The only
//! concurrency coordination in the crate lives here:
//! - [`lock`]: bounded-wait exclusive lock issuing per-acquisition tokens;
//! - [`context`]: cancellation-aware contexts carrying lock ownership;
//! - [`state`]: the lifecycle transition table;
//! - [`registry`]: once-filled collaborator slots and the config snapshot;
//! - [`core`]: the [`Runtime`] dispatching lifecycle operations;
//! - [`builder`]: construction.

mod builder;
mod context;
mod core;
mod lock;
mod registry;
mod state;

pub use builder::RuntimeBuilder;
pub use context::ExecContext;
pub use core::Runtime;
pub use lock::{CoreLock, Identity, LockGuard, LockToken, DEFAULT_LOCK_TIMEOUT};
pub use registry::Slot;
pub use state::{Lifecycle, LifecycleOp};

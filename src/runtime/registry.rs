//! Collaborator registry: the runtime's composition root.
//!
//! Holds exactly four collaborator slots plus the configuration snapshot.
//! Each slot goes `Uninitialized → Ready` exactly once and is never reset:
//! losing in-flight collaborator state on a repeated init would be worse
//! than refusing the refill. Pure composition, no business logic.

use std::sync::Arc;

use crate::collaborators::{ApiServer, AuthManager, Console, Robot};
use crate::config::{Config, Flags};

/// A once-filled collaborator slot.
#[derive(Debug)]
pub enum Slot<T> {
    /// Nothing here yet.
    Uninitialized,
    /// Populated, never reset.
    Ready(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Uninitialized
    }
}

impl<T> Slot<T> {
    /// Returns true once populated.
    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }

    /// Returns the value, if populated.
    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Ready(v) => Some(v),
            Slot::Uninitialized => None,
        }
    }

    /// Populates an empty slot. Returns false (and drops `value`) if the
    /// slot is already ready.
    pub fn fill(&mut self, value: T) -> bool {
        match self {
            Slot::Uninitialized => {
                *self = Slot::Ready(value);
                true
            }
            Slot::Ready(_) => false,
        }
    }
}

/// Merged configuration and parsed flags, set once on successful configure
/// and immutable to readers thereafter.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot {
    pub config: Config,
    pub flags: Flags,
}

/// The four collaborator slots plus the configuration snapshot.
#[derive(Default)]
pub(crate) struct Registry {
    pub auth: Slot<Arc<dyn AuthManager>>,
    pub robot: Slot<Arc<dyn Robot>>,
    pub api: Slot<Arc<dyn ApiServer>>,
    pub console: Slot<Arc<dyn Console>>,
    pub snapshot: Option<Snapshot>,
}

impl Registry {
    /// Returns true once all four slots are populated.
    pub fn is_ready(&self) -> bool {
        self.auth.is_ready()
            && self.robot.is_ready()
            && self.api.is_ready()
            && self.console.is_ready()
    }
}

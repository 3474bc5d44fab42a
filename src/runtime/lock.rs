//! Runtime identity and the bounded-wait exclusive lock.
//!
//! [`CoreLock`] guards exclusive mutation rights over one runtime. A
//! successful [`CoreLock::acquire`] yields a [`LockGuard`] carrying a fresh
//! [`LockToken`]; dropping the guard releases exclusivity and clears the
//! owner record on every exit path, so a finished holder can never leave
//! the lock held behind.
//!
//! The owner token is observable without blocking ([`CoreLock::owner`]),
//! which is what lets context reconciliation validate ownership across
//! independent call paths (api handlers, console sessions, the process
//! entry point) without holding a blocking primitive across await points.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::CoreError;

/// Default bounded-wait acquisition deadline.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(300);

/// Opaque random value naming one runtime instance. Immutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identity(Uuid);

impl Identity {
    pub(crate) fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying uuid.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque value proving exclusive mutation rights over one runtime.
///
/// At most one valid token exists per runtime at any instant, and a token
/// is only valid for the runtime that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockToken {
    issuer: Identity,
    grant: Uuid,
}

impl LockToken {
    pub(crate) fn fresh(issuer: Identity) -> Self {
        Self {
            issuer,
            grant: Uuid::new_v4(),
        }
    }

    /// Returns the identity of the runtime that issued this token.
    pub fn issuer(&self) -> Identity {
        self.issuer
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grant)
    }
}

type OwnerCell = Arc<Mutex<Option<LockToken>>>;

fn owner_read(cell: &OwnerCell) -> Option<LockToken> {
    *cell.lock().unwrap_or_else(|p| p.into_inner())
}

fn owner_write(cell: &OwnerCell, value: Option<LockToken>) {
    *cell.lock().unwrap_or_else(|p| p.into_inner()) = value;
}

/// Bounded-wait exclusive lock issuing per-acquisition tokens.
#[derive(Debug)]
pub struct CoreLock {
    issuer: Identity,
    timeout: Duration,
    excl: Arc<AsyncMutex<()>>,
    owner: OwnerCell,
}

impl CoreLock {
    pub(crate) fn new(issuer: Identity, timeout: Duration) -> Self {
        Self {
            issuer,
            timeout,
            excl: Arc::new(AsyncMutex::new(())),
            owner: Arc::new(Mutex::new(None)),
        }
    }

    /// Attempts exclusive acquisition, waiting at most the configured
    /// deadline.
    ///
    /// On success a fresh token is generated, recorded as the current
    /// owner, and returned inside a releasable [`LockGuard`]. On timeout
    /// nothing is mutated and [`CoreError::LockTimeout`] is returned.
    pub async fn acquire(&self) -> Result<LockGuard, CoreError> {
        let excl = Arc::clone(&self.excl);
        match tokio::time::timeout(self.timeout, excl.lock_owned()).await {
            Ok(excl) => {
                let token = LockToken::fresh(self.issuer);
                owner_write(&self.owner, Some(token));
                log::debug!("lock acquired: {token}");
                Ok(LockGuard {
                    token,
                    owner: Arc::clone(&self.owner),
                    _excl: excl,
                })
            }
            Err(_) => Err(CoreError::LockTimeout {
                timeout: self.timeout,
            }),
        }
    }

    /// Returns the current owner token without blocking.
    pub fn owner(&self) -> Option<LockToken> {
        owner_read(&self.owner)
    }

    /// Returns true while an owner token is recorded.
    pub fn is_locked(&self) -> bool {
        self.owner().is_some()
    }

    /// Overwrites the owner record with an externally observed token.
    ///
    /// Used by context reconciliation when ownership is adopted from an
    /// incoming context rather than granted by acquisition.
    pub(crate) fn force_owner(&self, token: LockToken) {
        owner_write(&self.owner, Some(token));
    }

    /// The acquisition deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Explicit, releasable proof of exclusive ownership.
///
/// Holding the guard is what makes mutation legal; dropping it releases
/// the lock and clears the owner record if it still names this guard's
/// token.
#[derive(Debug)]
pub struct LockGuard {
    token: LockToken,
    owner: OwnerCell,
    _excl: OwnedMutexGuard<()>,
}

impl LockGuard {
    /// Returns the token this guard carries.
    pub fn token(&self) -> LockToken {
        self.token
    }

    /// Rebinds the guard to an adopted token, updating the owner record.
    pub(crate) fn rekey(&mut self, token: LockToken) {
        self.token = token;
        owner_write(&self.owner, Some(token));
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut owner = self.owner.lock().unwrap_or_else(|p| p.into_inner());
        if *owner == Some(self.token) {
            *owner = None;
            log::debug!("lock released: {}", self.token);
        }
    }
}

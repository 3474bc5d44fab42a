//! Cancellation-aware execution contexts carrying lock ownership.
//!
//! An [`ExecContext`] travels with a call tree: it wraps a
//! [`CancellationToken`] and may carry a [`LockToken`] as an attached
//! value. Attachment is observation of ownership, not a grant; validation
//! always happens against the runtime's own owner record.

use tokio_util::sync::CancellationToken;

use crate::runtime::LockToken;

/// Ambient, cancellation-aware handle propagated across a call tree.
///
/// Cloning shares the cancellation token; [`ExecContext::child`] derives a
/// context cancelled together with its parent. The attached lock token, if
/// any, is carried by value.
#[derive(Clone, Debug)]
pub struct ExecContext {
    cancel: CancellationToken,
    token: Option<LockToken>,
}

impl ExecContext {
    /// Creates a root context: not cancelled, no token attached.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            token: None,
        }
    }

    /// Wraps an existing cancellation token.
    pub fn from_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            token: None,
        }
    }

    /// Derives a child context: cancelled when the parent is cancelled,
    /// carrying the same attached token.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            token: self.token,
        }
    }

    /// Returns a copy of this context with `token` attached.
    pub fn with_token(&self, token: LockToken) -> Self {
        Self {
            cancel: self.cancel.clone(),
            token: Some(token),
        }
    }

    /// Returns the attached lock token, if any.
    pub fn token(&self) -> Option<LockToken> {
        self.token
    }

    /// Non-blocking done check.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes when the context is cancelled.
    pub async fn done(&self) {
        self.cancel.cancelled().await
    }

    /// Cancels this context and everything derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel()
    }

    /// The underlying cancellation token, for handing to collaborators.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Identity;

    #[test]
    fn test_root_context_is_clean() {
        let ctx = ExecContext::new();
        assert!(!ctx.is_done());
        assert!(ctx.token().is_none());
    }

    #[test]
    fn test_child_inherits_token_and_cancellation() {
        let token = LockToken::fresh(Identity::random());
        let parent = ExecContext::new().with_token(token);
        let child = parent.child();

        assert_eq!(child.token(), Some(token));
        assert!(!child.is_done());
        parent.cancel();
        assert!(child.is_done());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = ExecContext::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());
    }

    #[tokio::test]
    async fn test_done_wakes_on_cancel() {
        let ctx = ExecContext::new();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.done().await });
        ctx.cancel();
        handle.await.expect("join");
    }
}

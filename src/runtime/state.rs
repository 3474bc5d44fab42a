//! Lifecycle states and the explicit transition function.
//!
//! Exactly one [`Lifecycle`] variant is active at a time; `Halted` is
//! terminal. Transitions go through [`Lifecycle::step`], which consumes the
//! current variant and returns what the operation is allowed to do: proceed
//! to a successor, do nothing, or fail with the fixed sentinel for that
//! (state, operation) pair. No caller mutates state directly; the runtime
//! steps and commits under one critical section, so two racing operations
//! can never both pass the check from the same state. Configure alone
//! commits at the end of its effects, which is what keeps a failed
//! configure from advancing past `Init`.

use std::fmt;

use crate::error::CoreError;

/// Lifecycle state of a runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed; collaborators may be initialized and configured.
    Init,
    /// Configured; serving may start and stop.
    Running,
    /// Gracefully stopped; only halt remains.
    Stopped,
    /// Terminal.
    Halted,
}

/// Lifecycle operations dispatched against the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleOp {
    Init,
    Configure,
    Start,
    Run,
    Stop,
    Halt,
}

/// What a permitted operation is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Perform the operation's effects, then commit this successor.
    Proceed(Lifecycle),
    /// Permitted but with nothing to do.
    Noop,
}

impl Lifecycle {
    /// Returns true for the terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Lifecycle::Halted)
    }

    /// The transition table: consumes the current variant and returns the
    /// permitted step, or the sentinel error for this (state, op) pair.
    pub(crate) fn step(self, op: LifecycleOp) -> Result<Step, CoreError> {
        use Lifecycle::*;

        match (self, op) {
            (Init, LifecycleOp::Init) => Ok(Step::Proceed(Init)),
            (Init, LifecycleOp::Configure) => Ok(Step::Proceed(Running)),

            (Running, LifecycleOp::Init) => Ok(Step::Noop),
            (Running, LifecycleOp::Start | LifecycleOp::Run) => Ok(Step::Proceed(Running)),
            (Running, LifecycleOp::Stop) => Ok(Step::Proceed(Stopped)),
            (Running, LifecycleOp::Halt) => Ok(Step::Proceed(Halted)),

            (Stopped, LifecycleOp::Init | LifecycleOp::Stop) => Ok(Step::Noop),
            (Stopped, LifecycleOp::Halt) => Ok(Step::Proceed(Halted)),

            (Halted, LifecycleOp::Halt) => Ok(Step::Noop),

            (state, op) => Err(CoreError::InvalidOp { state, op }),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Init => "init",
            Lifecycle::Running => "running",
            Lifecycle::Stopped => "stopped",
            Lifecycle::Halted => "halted",
        };
        f.write_str(s)
    }
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleOp::Init => "init",
            LifecycleOp::Configure => "configure",
            LifecycleOp::Start => "start",
            LifecycleOp::Run => "run",
            LifecycleOp::Stop => "stop",
            LifecycleOp::Halt => "halt",
        };
        f.write_str(s)
    }
}

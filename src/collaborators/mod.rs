//! Collaborator interfaces consumed by the runtime, plus embedded
//! reference implementations.
//!
//! The runtime owns and sequences four collaborators but implements none of
//! them; it only consumes these traits:
//! - [`AuthManager`] authentication manager
//! - [`Robot`] robot controller (also exposes its request surface)
//! - [`ApiServer`] api server with a mount table
//! - [`Console`] interactive console
//!
//! The embedded implementations ([`FsAuth`], [`LocalRobot`], [`LocalApi`],
//! [`LocalConsole`]) are in-process reference collaborators the builder
//! wires by default; anything network-facing replaces them behind the same
//! traits.

mod api;
mod auth;
mod console;
mod robot;

pub use api::{ApiHandler, ApiServer, LocalApi};
pub use auth::{AuthManager, FsAuth};
pub use console::{Console, LocalConsole};
pub use robot::{LocalRobot, Robot};

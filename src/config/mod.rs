//! Layered configuration: merged JSON tree, profiles, and flag overrides.
//!
//! This module groups the configuration **data model** and the pieces that
//! feed it:
//! - [`Config`] merged JSON tree with named sections and typed snapshots
//! - [`Profile`] named profile resolving the layered file lookup paths
//! - [`Flags`] environment-driven overrides applied onto the merged tree
//! - typed section snapshots consumed by collaborators:
//!   [`MasterConfig`], [`ApiSurfaceConfig`], [`ServerConfig`],
//!   [`ConsoleConfig`]
//!
//! Merge order: defaults, then each existing profile file in
//! [`Profile::config_files`] order (later files override earlier), then
//! flag/environment overrides during `configure`.

mod config;
mod flags;
mod profile;

pub use config::{ApiSurfaceConfig, Config, ConsoleConfig, MasterConfig, ServerConfig};
pub use flags::Flags;
pub use profile::Profile;

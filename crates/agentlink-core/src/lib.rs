//! agentlink core - override merging and symlink reconciliation
//!
//! This crate resolves profiles and user overrides into an effective
//! configuration, renders merged settings caches, reconciles symlinks
//! from agent config locations into a tracked repository, and keeps
//! managed MCP servers and plugins in sync.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub mod backup;
pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod exec;
pub mod format;
pub mod layout;
pub mod managed;
pub mod merge;
pub mod ops;
pub mod path;
pub mod profile;
pub mod symlink;
pub mod util;
pub mod validate;

pub use agentlink_agents;

pub use cache::{OrphanCleanup, SettingsCache};
pub use config::{ActiveState, EffectiveConfig, UserConfig};
pub use error::{CoreError, CoreResult};
pub use layout::Layout;
pub use merge::deep_merge;
pub use ops::Session;
pub use profile::{Profile, ProfileLoader};
pub use symlink::{LinkAction, LinkOutcome, LinkStatus};
pub use validate::{validate_override, ValidationReport};

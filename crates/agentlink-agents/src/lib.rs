//! agentlink agents - where each AI coding assistant expects its configuration
//!
//! This crate is static data: the closed set of supported agents, the
//! home-relative locations each one reads, and the tracked files in the
//! managed repository those locations should point at. It never touches
//! anything outside the repository it enumerates.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

pub mod agent;
pub mod descriptor;
pub mod error;
pub mod format;

pub use agent::{AgentContext, AgentKind, SettingsSpec};
pub use descriptor::{expand_home, DescriptorKind, SymlinkDescriptor};
pub use error::{AgentError, AgentResult};
pub use format::SettingsFormat;

//! User configuration, persistent state and the effective layered view

mod effective;
mod exclude;
mod state;
mod user;

pub use effective::EffectiveConfig;
pub use exclude::ExclusionSet;
pub use state::ActiveState;
pub use user::{ProjectConfig, UserConfig};

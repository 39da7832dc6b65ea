//! Profile types and inheritance resolution

mod error;
mod loader;
mod types;

pub use error::ProfileError;
pub use loader::{ProfileLoader, ProfileSummary};
pub use types::*;

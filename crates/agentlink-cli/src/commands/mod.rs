//! CLI command handlers
//!
//! Each subcommand group has its own module. Handlers print human-readable
//! reports to stdout; logs go to stderr.

pub mod config;
pub mod exclude;
pub mod install;
pub mod overrides;
pub mod profile;
pub mod prompt;
pub mod status;

/// Print `label: a, b, c`, or nothing when empty
pub fn print_list(label: &str, items: &[String]) {
    if !items.is_empty() {
        println!("  {label}: {}", items.join(", "));
    }
}

//! agentlink CLI - link AI agent configuration to a tracked repository
//!
//! Provides `agentlink install`, `agentlink status`, `agentlink override`,
//! `agentlink profile` and related commands.

mod commands;

use std::path::PathBuf;

use agentlink_agents::AgentKind;
use agentlink_core::{CoreError, Layout};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommands;
use commands::exclude::ExcludeCommands;
use commands::overrides::OverrideCommands;
use commands::profile::ProfileCommands;

#[derive(Parser)]
#[command(name = "agentlink")]
#[command(about = "agentlink - symlink AI agent configuration from a dotfiles repository")]
#[command(version)]
struct Cli {
    /// Repository root (defaults to $AGENTLINK_REPO, then the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    repo: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link agent configuration into place
    Install(InstallArgs),
    /// Remove links and managed entries created by install
    Uninstall(UninstallArgs),
    /// Show link, cache and managed entry status
    Status {
        #[command(flatten)]
        agents: AgentFilter,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what install would change in merged settings and MCP servers
    Diff {
        #[command(flatten)]
        agents: AgentFilter,
    },
    /// List supported agents
    ListAgents,
    /// Check a setting path against an agent's base settings
    Validate {
        /// Agent name
        agent: String,
        /// Setting path, e.g. `hooks.Stop[0].command`
        path: String,
    },
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Manage settings overrides in the user config
    Override {
        #[command(subcommand)]
        action: OverrideCommands,
    },
    /// Manage symlink exclusions
    Exclude {
        #[command(subcommand)]
        action: ExcludeCommands,
    },
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Restrict a command to some agents
#[derive(Args, Debug, Clone, Default)]
pub struct AgentFilter {
    /// Only this agent (repeatable)
    #[arg(short, long = "agent", value_name = "AGENT")]
    pub agents: Vec<AgentKind>,
}

/// Arguments for `agentlink install`
#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub agents: AgentFilter,

    /// Replace existing files and overwrite modified MCP servers without asking
    #[arg(short, long)]
    pub force: bool,

    /// Answer yes to every prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Preview changes without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Rebuild merged settings even when they are fresh
    #[arg(long)]
    pub rebuild_cache: bool,

    /// Do not run the `claude plugin` CLI
    #[arg(long)]
    pub no_plugins: bool,
}

/// Arguments for `agentlink uninstall`
#[derive(Args, Debug)]
pub struct UninstallArgs {
    #[command(flatten)]
    pub agents: AgentFilter,

    /// Remove links without asking
    #[arg(short, long)]
    pub force: bool,

    /// Answer yes to every prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Preview changes without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Do not run the `claude plugin` CLI
    #[arg(long)]
    pub no_plugins: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        match e.downcast_ref::<CoreError>() {
            Some(core) => eprintln!("Error [{}]: {e:#}", core.code()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let layout = Layout::discover(cli.repo)?;
    tracing::debug!(
        repo = %layout.repo_root.display(),
        home = %layout.home.display(),
        "resolved layout"
    );

    match cli.command {
        Commands::Install(args) => commands::install::run_install(layout, &args),
        Commands::Uninstall(args) => commands::install::run_uninstall(layout, &args),
        Commands::Status { agents, json } => commands::status::run_status(layout, &agents, json),
        Commands::Diff { agents } => commands::status::run_diff(layout, &agents),
        Commands::ListAgents => commands::config::run_list_agents(&layout),
        Commands::Validate { agent, path } => commands::overrides::run_validate(&layout, &agent, &path),
        Commands::Profile { action } => commands::profile::execute(action, &layout),
        Commands::Override { action } => commands::overrides::execute(action, &layout),
        Commands::Exclude { action } => commands::exclude::execute(action, &layout),
        Commands::Config { action } => commands::config::execute(action, layout),
    }
}

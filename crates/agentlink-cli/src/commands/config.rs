//! Configuration inspection commands
//!
//! Handles: agentlink config show, agentlink list-agents

use agentlink_agents::AgentKind;
use agentlink_core::{Layout, Session};
use clap::Subcommand;

/// Config commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (active profile plus user config) as YAML
    Show,
    /// Print the locations agentlink reads and writes
    Paths,
}

/// Execute config command
pub fn execute(cmd: ConfigCommands, layout: Layout) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let session = Session::load(layout)?;
            print!("{}", serde_yaml::to_string(&session.config)?);
        }
        ConfigCommands::Paths => {
            println!("repository:   {}", layout.repo_root.display());
            println!("config:       {}", layout.config_dir().display());
            println!("profiles:     {}", layout.profiles_dir().display());
            println!("user config:  {}", layout.user_config_path().display());
            println!("state:        {}", layout.state_path().display());
            println!("cache:        {}", layout.cache_dir().display());
        }
    }
    Ok(())
}

/// Execute `agentlink list-agents`
pub fn run_list_agents(layout: &Layout) -> anyhow::Result<()> {
    let ctx = layout.agent_context();
    println!("{:<8} {:<10} {}", "AGENT", "SETTINGS", "LINKS");
    for agent in AgentKind::ALL {
        let format = agent
            .settings()
            .map_or_else(|| "-".to_string(), |spec| spec.format.to_string());
        let links = agent.symlinks(&ctx)?.len();
        println!("{agent:<8} {format:<10} {links}");
    }
    Ok(())
}

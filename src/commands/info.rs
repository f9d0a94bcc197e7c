use clap::{Args, CommandFactory};

use asynclog::config::ConfigManager;

use crate::commands::Asynclog;

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cmd {}

impl Cmd {
    pub fn run(&self, config: &impl ConfigManager) -> eyre::Result<()> {
        let path = config
            .config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let resolved = config.load()?;

        println!(
            "Version:        {}",
            Asynclog::command().get_version().unwrap_or("")
        );
        println!("Config Path:    {}", path);
        println!("Config:");
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        Ok(())
    }
}

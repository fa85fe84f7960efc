//! Configuration view and initialization: `trike config`.

use anyhow::Result;
use std::path::Path;

use trike::config::{TrikeConfig, config_path};
use trike::ui::icons;

use super::effective_config;
use crate::{Cli, ConfigCommands};

pub fn cmd_config(project_dir: &Path, cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let path = config_path(project_dir);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Trike Configuration");
            println!("===================");
            println!();
            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("No trike.toml found at {}", path.display());
                println!("Using default configuration.");
            }
            println!();

            let config = effective_config(project_dir, cli)?;
            println!("Effective values (with env/CLI overrides):");
            println!("[api]");
            println!("  base_url = \"{}\"", config.api.base_url);
            println!("  status_path = \"{}\"", config.api.status_path);
            println!(
                "  token = {}",
                if config.api.token.is_some() { "(set)" } else { "(unset)" }
            );
            println!("  timeout_secs = {}", config.api.timeout_secs);
            println!("[realtime]");
            println!(
                "  socket_url = {}",
                config
                    .realtime
                    .socket_url
                    .as_deref()
                    .map(|u| format!("\"{}\"", u))
                    .unwrap_or_else(|| "(unset)".to_string())
            );
            println!("  channel = \"{}\"", config.realtime.channel);
            println!("[monitor]");
            println!("  poll_interval_secs = {}", config.monitor.poll_interval_secs);
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            TrikeConfig::default().save(&path)?;
            println!("{}Created {}", icons::CHECK, path.display());
        }
    }

    Ok(())
}

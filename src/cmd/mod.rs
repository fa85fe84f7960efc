//! CLI command implementations.
//!
//! | Module      | Commands handled          |
//! |-------------|---------------------------|
//! | `countdown` | `Countdown`               |
//! | `dispatch`  | `Status`, `Watch`         |
//! | `config`    | `Config`                  |

pub mod config;
pub mod countdown;
pub mod dispatch;

pub use config::cmd_config;
pub use countdown::cmd_countdown;
pub use dispatch::{cmd_status, cmd_watch};

use anyhow::Result;
use std::path::Path;
use trike::config::TrikeConfig;

use super::Cli;

/// Load trike.toml and apply environment and CLI overrides, in that order.
pub fn effective_config(project_dir: &Path, cli: &Cli) -> Result<TrikeConfig> {
    let mut config = TrikeConfig::load_or_default(project_dir)?.with_env_overrides();
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(url) = &cli.socket_url {
        config.realtime.socket_url = Some(url.clone());
    }
    Ok(config)
}

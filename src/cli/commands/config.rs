//! Config command implementation

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::app::App;
use crate::models::config::LspcConfig;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default configuration file
    Init {
        /// Initialize global config (~/.config/lspc)
        #[arg(long)]
        global: bool,

        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Show global config only
        #[arg(long)]
        global: bool,
    },

    /// Show config file path
    Path {
        /// Show global config path
        #[arg(long)]
        global: bool,
    },
}

#[derive(Serialize)]
struct ConfigInitResponse {
    status: &'static str,
    path: String,
    level: &'static str,
}

#[derive(Serialize)]
struct ConfigShowResponse<'a> {
    level: &'static str,
    config: &'a LspcConfig,
}

#[derive(Serialize)]
struct ConfigPathResponse {
    level: &'static str,
    path: String,
    exists: bool,
}

fn level(global: bool, local: &'static str) -> &'static str {
    if global { "global" } else { local }
}

pub async fn execute(args: ConfigArgs, app: &App) -> Result<()> {
    let ctx = &app.output;

    match args.command {
        ConfigCommand::Init { global, force } => {
            let path = app.config_service.init(global, force).await?;
            ctx.print_success_flat(ConfigInitResponse {
                status: "created",
                path: ctx.relative_path(&path),
                level: level(global, "project"),
            });
        }

        ConfigCommand::Show { global } => {
            let config = if global {
                app.config_service.load(true).await?
            } else {
                app.config().clone()
            };
            ctx.print_success_flat(ConfigShowResponse {
                level: level(global, "merged"),
                config: &config,
            });
        }

        ConfigCommand::Path { global } => {
            let path = app.config_service.config_path(global);
            ctx.print_success_flat(ConfigPathResponse {
                level: level(global, "project"),
                exists: path.exists(),
                path: ctx.relative_path(&path),
            });
        }
    }

    Ok(())
}

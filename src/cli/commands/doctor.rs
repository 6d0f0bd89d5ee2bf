//! Doctor command - configured servers and whether they can be launched

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::infra::lsp::servers::is_installed;
use crate::models::config::ServerConfig;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Only list servers that are not installed
    #[arg(long)]
    pub missing_only: bool,
}

#[derive(Serialize)]
struct DoctorResponse {
    summary: DoctorSummary,
    servers: Vec<ServerEntry>,
}

#[derive(Serialize)]
struct DoctorSummary {
    installed: usize,
    missing: usize,
}

#[derive(Serialize)]
struct ServerEntry {
    name: String,
    command: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    file_types: Vec<String>,
    installed: bool,
}

impl ServerEntry {
    fn new(config: &ServerConfig, installed: bool) -> Self {
        Self {
            name: config.identity().to_string(),
            command: config.command.clone(),
            args: config.args.clone(),
            file_types: config.file_types.clone(),
            installed,
        }
    }
}

pub fn execute(args: DoctorArgs, app: &App) -> Result<()> {
    let ctx = &app.output;

    let entries: Vec<ServerEntry> = app
        .catalog()
        .servers()
        .iter()
        .map(|config| ServerEntry::new(config, is_installed(config)))
        .collect();

    let installed = entries.iter().filter(|s| s.installed).count();
    let missing = entries.len() - installed;
    let servers = entries
        .into_iter()
        .filter(|s| !args.missing_only || !s.installed)
        .collect();

    ctx.print_success_flat(DoctorResponse {
        summary: DoctorSummary { installed, missing },
        servers,
    });
    Ok(())
}

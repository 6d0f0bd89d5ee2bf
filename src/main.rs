//! lspc - drive language servers from the command line

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lspc::app::App;
use lspc::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Quiet by default; RUST_LOG wins over -v
    let default_filter = if cli.verbose { "lspc=debug" } else { "lspc=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!(
                r#"{{"success":false,"error":"Failed to create runtime: {}"}}"#,
                e
            );
            std::process::exit(1);
        }
    };
    let result = runtime.block_on(async_main(cli));

    if let Err(e) = result {
        // Errors are JSON too, so callers parse one format
        let response = serde_json::json!({
            "success": false,
            "error": format!("{e:#}")
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&response)
                .unwrap_or_else(|_| format!(r#"{{"success":false,"error":"{}"}}"#, e))
        );
        std::process::exit(2);
    }
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    let app = App::new(cli.server, cli.show_log)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize: {}", e))?;

    execute_command(cli.command, &app).await
}

async fn execute_command(command: Commands, app: &App) -> anyhow::Result<()> {
    use lspc::cli::commands;

    match command {
        Commands::Hover(args) => commands::hover::execute(args, app).await,
        Commands::Complete(args) => commands::complete::execute(args, app).await,
        Commands::Format(args) => commands::format::execute(args, app).await,
        Commands::Find(args) => commands::find::execute(args, app).await,
        Commands::Diagnostics(args) => commands::diagnostics::execute(args, app).await,
        Commands::Doctor(args) => commands::doctor::execute(args, app),
        Commands::Config(args) => commands::config::execute(args, app).await,
    }
}

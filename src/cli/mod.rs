//! CLI module for lspc
//!
//! Provides command-line interface using clap derive macros.

pub mod commands;
pub mod driver;
pub mod location;
pub mod output;

pub use driver::{Answer, CliHost, Driver, SessionReport};
pub use location::ParsedLocation;
pub use output::OutputContext;

use clap::{Parser, Subcommand};

use commands::{
    complete::CompleteArgs, config::ConfigArgs, diagnostics::DiagnosticsArgs, doctor::DoctorArgs,
    find::FindArgs, format::FormatArgs, hover::HoverArgs,
};

const LONG_ABOUT: &str = r#"
lspc - drive any language server from the command line

Each invocation starts the server for one file, performs one request over
stdio and shuts the server down again. Output is JSON.

EXAMPLES:
  lspc hover src/main.rs:10:5
  lspc complete src/main.rs:12:9
  lspc format src/main.rs --write
  lspc find refs src/api.go:25:10
  lspc find symbols src/api.go
  lspc diagnostics src/lib.c --severity error
  lspc --server "clangd --log=verbose" --show-log hover src/lib.c:4:1

Servers are picked by file type; see 'lspc doctor' for the list and
'lspc config init' to add your own.
"#;

/// lspc - drive any language server from the command line
#[derive(Parser, Debug)]
#[command(name = "lspc")]
#[command(author, version, about, long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
#[command(after_help = "Use 'lspc <COMMAND> --help' for more information about a command.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server to use: a configured name, or a program with arguments
    #[arg(long, global = true, env = "LSPC_SERVER")]
    pub server: Option<String>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Include the server's captured stderr in the output
    #[arg(long, global = true)]
    pub show_log: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hover information at a position
    Hover(HoverArgs),

    /// Completion candidates at a position
    Complete(CompleteArgs),

    /// Format a file or a span of lines
    Format(FormatArgs),

    /// Definitions, references and symbols
    Find(FindArgs),

    /// Diagnostics published for a file
    Diagnostics(DiagnosticsArgs),

    /// Show configured servers and whether they are installed
    Doctor(DoctorArgs),

    /// Configuration management
    Config(ConfigArgs),
}

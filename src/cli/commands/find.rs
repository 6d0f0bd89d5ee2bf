//! Find command implementation
//!
//! Navigation requests: definition-like jumps, references and the symbol
//! outline of a file.

use std::path::Path;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::app::App;
use crate::cli::location::resolve_file;
use crate::cli::output::LocationOutput;
use crate::cli::{Answer, Driver, ParsedLocation, SessionReport};
use crate::services::lsp::RequestKind;

#[derive(Args, Debug)]
pub struct FindArgs {
    /// What to look for
    #[arg(value_enum)]
    pub kind: FindKind,

    /// File path with position (file:line:column); a plain file for `symbols`
    pub location: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindKind {
    /// Go to definition
    Def,
    /// Go to declaration
    Decl,
    /// Go to type definition
    Type,
    /// Find implementations
    Impl,
    /// Find references
    Refs,
    /// Document symbols
    Symbols,
}

impl FindKind {
    fn request(&self) -> RequestKind {
        match self {
            Self::Def => RequestKind::Definition,
            Self::Decl => RequestKind::Declaration,
            Self::Type => RequestKind::TypeDefinition,
            Self::Impl => RequestKind::Implementation,
            Self::Refs => RequestKind::References,
            Self::Symbols => RequestKind::DocumentSymbols,
        }
    }
}

#[derive(Serialize)]
struct FindResponse {
    kind: &'static str,
    count: usize,
    results: Vec<LocationOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    session: SessionReport,
}

pub async fn execute(args: FindArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let loc = match args.kind {
        FindKind::Symbols => match ParsedLocation::parse(&args.location) {
            Ok(loc) => loc.resolve(app.root())?,
            Err(_) => ParsedLocation {
                file: resolve_file(app.root(), Path::new(&args.location))?,
                line: 1,
                column: 1,
            },
        },
        _ => ParsedLocation::parse(&args.location)?.resolve(app.root())?,
    };

    let mut driver = Driver::start(app, &loc.file).await?;
    let cursor = driver.offset(loc.line, loc.column);
    let answer = driver.request(args.kind.request(), cursor, None).await;
    let session = driver.finish().await;

    let (results, message) = match answer? {
        Answer::Location(location) => (vec![ctx.location(&location, None)], None),
        Answer::Locations { entries, .. } => {
            let results = entries
                .iter()
                .map(|entry| {
                    let label = (args.kind == FindKind::Symbols).then(|| entry.label.clone());
                    ctx.location(&entry.location, label)
                })
                .collect();
            (results, None)
        }
        Answer::Notice { message, .. } => (Vec::new(), Some(message)),
        other => bail!("Unexpected navigation answer: {other:?}"),
    };

    ctx.print_success_flat(FindResponse {
        kind: args.kind.request().capability().display_name(),
        count: results.len(),
        results,
        message,
        session,
    });
    Ok(())
}

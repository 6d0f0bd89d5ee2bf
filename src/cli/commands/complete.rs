//! Complete command implementation

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::cli::{Answer, Driver, ParsedLocation, SessionReport};
use crate::services::lsp::RequestKind;

#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// File path with position (file:line:column), usually just after a partial word
    pub location: String,

    /// Maximum number of items to print
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct CompleteResponse {
    file: String,
    line: u32,
    column: u32,
    total: usize,
    items: Vec<String>,
    #[serde(flatten)]
    session: SessionReport,
}

pub async fn execute(args: CompleteArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let loc = ParsedLocation::parse(&args.location)?.resolve(app.root())?;

    let mut driver = Driver::start(app, &loc.file).await?;
    let cursor = driver.offset(loc.line, loc.column);
    let answer = driver.request(RequestKind::Completion, cursor, None).await;
    let session = driver.finish().await;

    let mut items = match answer? {
        Answer::Completions(items) => items,
        Answer::Notice { .. } => Vec::new(),
        other => bail!("Unexpected completion answer: {other:?}"),
    };
    let total = items.len();
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }

    ctx.print_success_flat(CompleteResponse {
        file: ctx.relative_path(&loc.file),
        line: loc.line,
        column: loc.column,
        total,
        items,
        session,
    });
    Ok(())
}

//! Hover command implementation
//!
//! Get hover information (type, documentation) for a position.

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::cli::{Answer, Driver, ParsedLocation, SessionReport};
use crate::services::lsp::RequestKind;

#[derive(Args, Debug)]
pub struct HoverArgs {
    /// File path with position (file:line:column)
    pub location: String,
}

#[derive(Serialize)]
struct HoverResponse {
    file: String,
    line: u32,
    column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    session: SessionReport,
}

pub async fn execute(args: HoverArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let loc = ParsedLocation::parse(&args.location)?.resolve(app.root())?;

    let mut driver = Driver::start(app, &loc.file).await?;
    let cursor = driver.offset(loc.line, loc.column);
    let answer = driver.request(RequestKind::Hover, cursor, None).await;
    let session = driver.finish().await;

    let (content, message) = match answer? {
        Answer::Text { text, .. } => (Some(text), None),
        Answer::Notice { message, .. } => (None, Some(message)),
        other => bail!("Unexpected hover answer: {other:?}"),
    };

    ctx.print_success_flat(HoverResponse {
        file: ctx.relative_path(&loc.file),
        line: loc.line,
        column: loc.column,
        content,
        message,
        session,
    });
    Ok(())
}

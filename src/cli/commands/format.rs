//! Format command implementation
//!
//! Whole-document or line-span formatting. The result is printed unless
//! `--write` puts it back into the file.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::cli::location::{parse_line_span, resolve_file};
use crate::cli::{Answer, Driver, SessionReport};
use crate::services::lsp::RequestKind;

#[derive(Args, Debug)]
pub struct FormatArgs {
    /// File to format
    pub file: PathBuf,

    /// Only format these lines (1-indexed, inclusive), e.g. 10:24
    #[arg(long)]
    pub lines: Option<String>,

    /// Write the result back to the file
    #[arg(short, long)]
    pub write: bool,
}

#[derive(Serialize)]
struct FormatResponse {
    file: String,
    changed: bool,
    written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(flatten)]
    session: SessionReport,
}

pub async fn execute(args: FormatArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let file = resolve_file(app.root(), &args.file)?;
    let span = args.lines.as_deref().map(parse_line_span).transpose()?;

    let mut driver = Driver::start(app, &file).await?;
    let answer = match span {
        Some((first, last)) => {
            let start = driver.offset(first, 1);
            let end = driver.offset(last + 1, 1);
            driver
                .request(RequestKind::RangeFormat, start, Some((start, end)))
                .await
        }
        None => driver.request(RequestKind::Format, 0, None).await,
    };
    let session = driver.finish().await;

    let formatted = match answer? {
        Answer::Replaced { text, .. } => Some(text),
        Answer::Notice { .. } => None,
        other => bail!("Unexpected formatting answer: {other:?}"),
    };

    let written = match (&formatted, args.write) {
        (Some(text), true) => {
            tokio::fs::write(&file, text)
                .await
                .with_context(|| format!("Failed to write {}", file.display()))?;
            true
        }
        _ => false,
    };

    ctx.print_success_flat(FormatResponse {
        file: ctx.relative_path(&file),
        changed: formatted.is_some(),
        written,
        text: formatted.filter(|_| !written),
        session,
    });
    Ok(())
}

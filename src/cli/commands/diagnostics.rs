//! Diagnostics command implementation
//!
//! Opens the file, waits for the server's first publication and prints it.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::cli::location::resolve_file;
use crate::cli::{Answer, Driver, SessionReport};
use crate::models::diagnostic::{DiagnosticSeverity, RenderedDiagnostic};

#[derive(Args, Debug)]
pub struct DiagnosticsArgs {
    /// File path to check
    pub file: PathBuf,

    /// Also show what covers this line (1-indexed)
    #[arg(long)]
    pub line: Option<u32>,

    /// Filter by severity (error, warning, info, hint)
    #[arg(long, short = 's', value_delimiter = ',')]
    pub severity: Option<Vec<DiagnosticSeverity>>,
}

#[derive(Serialize)]
struct DiagnosticOutput {
    server: String,
    severity: DiagnosticSeverity,
    line: u32,
    column: u32,
    end_column: u32,
    message: String,
}

impl DiagnosticOutput {
    fn new(server: &str, diagnostic: &RenderedDiagnostic) -> Self {
        Self {
            server: server.to_string(),
            severity: diagnostic.severity,
            line: diagnostic.line + 1,
            column: diagnostic.start + 1,
            end_column: diagnostic.end + 1,
            message: diagnostic.text.clone(),
        }
    }
}

#[derive(Serialize)]
struct DiagnosticsResponse {
    file: String,
    /// False when the server published nothing before the wait ran out
    published: bool,
    count: usize,
    diagnostics: Vec<DiagnosticOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    at_line: Option<Vec<String>>,
    #[serde(flatten)]
    session: SessionReport,
}

fn wanted(filter: Option<&[DiagnosticSeverity]>, severity: DiagnosticSeverity) -> bool {
    filter.is_none_or(|filter| filter.contains(&severity))
}

pub async fn execute(args: DiagnosticsArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let file = resolve_file(app.root(), &args.file)?;

    let mut driver = Driver::start(app, &file).await?;
    let published = driver.wait_diagnostics().await;

    let diagnostics: Vec<DiagnosticOutput> = driver
        .host()
        .diagnostics()
        .iter()
        .flat_map(|(server, list)| list.iter().map(move |d| (server, d)))
        .filter(|(_, d)| wanted(args.severity.as_deref(), d.severity))
        .map(|(server, d)| DiagnosticOutput::new(server, d))
        .collect();

    let at_line = args.line.map(|line| driver.line_diagnostics(line));
    let session = driver.finish().await;

    let at_line = match at_line.transpose()? {
        Some(Answer::Text { text, .. }) => Some(text.lines().map(str::to_string).collect()),
        Some(Answer::Notice { .. }) => Some(Vec::new()),
        Some(other) => bail!("Unexpected diagnostics answer: {other:?}"),
        None => None,
    };

    ctx.print_success_flat(DiagnosticsResponse {
        file: ctx.relative_path(&file),
        published,
        count: diagnostics.len(),
        diagnostics,
        at_line,
        session,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_filter() {
        let filter = [DiagnosticSeverity::Error, DiagnosticSeverity::Warning];
        assert!(wanted(Some(&filter), DiagnosticSeverity::Warning));
        assert!(!wanted(Some(&filter), DiagnosticSeverity::Hint));
        assert!(wanted(None, DiagnosticSeverity::Hint));
    }

    #[test]
    fn test_output_is_one_indexed() {
        let rendered = RenderedDiagnostic {
            severity: DiagnosticSeverity::Error,
            text: "(rustc E0308) mismatched types".into(),
            line: 4,
            start: 8,
            end: 12,
        };
        let out = DiagnosticOutput::new("rust-analyzer", &rendered);
        assert_eq!((out.line, out.column, out.end_column), (5, 9, 13));
    }
}

//! One-shot session driver
//!
//! Runs a `Session` against a single file: start one server, show the file
//! in one view, issue a request, stop. The CLI is the only place that
//! waits, and every wait is bounded by a deadline.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::time::Instant;

use crate::app::App;
use crate::error::NoticeLevel;
use crate::infra::lsp::protocol::{MessageType, ServerInfo};
use crate::infra::lsp::servers::{ServerCatalog, language_id_for_path};
use crate::infra::lsp::ProcessLauncher;
use crate::models::config::LspSettings;
use crate::models::diagnostic::RenderedDiagnostic;
use crate::models::lsp::{Location, LocationEntry, Position};
use crate::services::lsp::{Action, BufferSnapshot, Host, RequestKind, Session, StartTarget, ViewId};

/// The single view the CLI shows its file in
pub const VIEW: ViewId = ViewId(1);

/// What the session handed back in response to an action
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Notice { level: NoticeLevel, message: String },
    Text { title: String, text: String },
    Location(Location),
    Replaced { text: String, cursor: usize },
    Completions(Vec<String>),
    Locations { title: String, entries: Vec<LocationEntry> },
}

impl Answer {
    /// Warnings and errors become command failures
    pub fn into_result(self) -> Result<Self> {
        match self {
            Answer::Notice {
                level: NoticeLevel::Error | NoticeLevel::Warning,
                message,
            } => bail!(message),
            other => Ok(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    pub level: &'static str,
    pub message: String,
}

/// Host that records everything for the command to print
#[derive(Debug, Default)]
pub struct CliHost {
    buffers: HashMap<PathBuf, BufferSnapshot>,
    answers: Vec<Answer>,
    server_info: Option<String>,
    messages: Vec<ServerMessage>,
    diagnostics: BTreeMap<String, Vec<RenderedDiagnostic>>,
    publications: usize,
}

impl CliHost {
    pub fn set_buffer(&mut self, path: &Path, snapshot: BufferSnapshot) {
        self.buffers.insert(path.to_path_buf(), snapshot);
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn last_notice(&self) -> Option<&str> {
        self.answers.iter().rev().find_map(|answer| match answer {
            Answer::Notice { message, .. } => Some(message.as_str()),
            _ => None,
        })
    }

    /// Diagnostics shown in the CLI view, by server identity
    pub fn diagnostics(&self) -> &BTreeMap<String, Vec<RenderedDiagnostic>> {
        &self.diagnostics
    }
}

impl Host for CliHost {
    fn buffer(&self, path: &Path) -> Option<BufferSnapshot> {
        self.buffers.get(path).cloned()
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        tracing::debug!("notice ({:?}): {}", level, message);
        self.answers.push(Answer::Notice {
            level,
            message: message.to_string(),
        });
    }

    fn connected(&mut self, identity: &str, server: Option<&ServerInfo>) {
        tracing::info!("{} connected", identity);
        self.server_info = server.map(ToString::to_string);
    }

    fn server_message(&mut self, _identity: &str, level: MessageType, message: &str) {
        let level = match level {
            MessageType::Error => "error",
            MessageType::Warning => "warning",
            MessageType::Info => "info",
            MessageType::Log => "log",
        };
        self.messages.push(ServerMessage {
            level,
            message: message.to_string(),
        });
    }

    fn show_text(&mut self, title: &str, text: &str) {
        self.answers.push(Answer::Text {
            title: title.to_string(),
            text: text.to_string(),
        });
    }

    fn open_location(&mut self, location: &Location) {
        self.answers.push(Answer::Location(location.clone()));
    }

    fn replace_document(&mut self, path: &Path, text: &str, cursor: usize) {
        self.set_buffer(path, BufferSnapshot::new(text, cursor));
        self.answers.push(Answer::Replaced {
            text: text.to_string(),
            cursor,
        });
    }

    fn show_completions(&mut self, items: &[String]) {
        self.answers.push(Answer::Completions(items.to_vec()));
    }

    fn dismiss_completion(&mut self) {
        tracing::debug!("completion dismissed");
    }

    fn show_locations(&mut self, title: &str, entries: &[LocationEntry]) {
        self.answers.push(Answer::Locations {
            title: title.to_string(),
            entries: entries.to_vec(),
        });
    }

    fn set_diagnostics(&mut self, view: ViewId, identity: &str, diagnostics: &[RenderedDiagnostic]) {
        if view != VIEW {
            return;
        }
        self.publications += 1;
        if diagnostics.is_empty() {
            self.diagnostics.remove(identity);
        } else {
            self.diagnostics
                .insert(identity.to_string(), diagnostics.to_vec());
        }
    }
}

/// Session facts attached to every command's output
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ServerMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// Pick the server for a file: `--server` first, then the file type
pub fn start_target(catalog: &ServerCatalog, server: Option<&str>, file: &Path) -> Result<StartTarget> {
    if let Some(server) = server {
        if let Some(config) = catalog.find(server) {
            return Ok(StartTarget::Command {
                name: Some(config.identity().to_string()),
                command: config.command.clone(),
                args: config.args.clone(),
            });
        }
        let mut words = server.split_whitespace();
        let command = words.next().context("--server cannot be empty")?;
        return Ok(StartTarget::Command {
            name: None,
            command: command.to_string(),
            args: words.map(str::to_string).collect(),
        });
    }

    let language = language_id_for_path(file).with_context(|| {
        format!(
            "Cannot infer a language for {}. Use --server to pick one.",
            file.display()
        )
    })?;
    Ok(StartTarget::FileType(language.to_string()))
}

pub struct Driver {
    session: Session,
    host: CliHost,
    settings: LspSettings,
    identity: String,
    file: PathBuf,
    show_log: bool,
}

impl Driver {
    /// Start the file's server, wait for its handshake and show the file
    pub async fn start(app: &App, file: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let target = start_target(app.catalog(), app.server.as_deref(), file)?;

        let settings = app.config().lsp.clone();
        let mut session = Session::new(
            app.root().to_path_buf(),
            settings.clone(),
            app.catalog().clone(),
            Box::new(ProcessLauncher::default()),
        );
        let mut host = CliHost::default();
        host.set_buffer(file, BufferSnapshot::new(text, 0));

        session.dispatch(Action::Start(target), &mut host);
        let Some(identity) = session.identities().into_iter().next() else {
            bail!("{}", host.last_notice().unwrap_or("Server did not start"));
        };

        let mut driver = Self {
            session,
            host,
            settings,
            identity,
            file: file.to_path_buf(),
            show_log: app.show_log,
        };

        let identity = driver.identity.clone();
        let deadline = driver.request_deadline();
        let settled = driver
            .session
            .run_until(&mut driver.host, deadline, |session, _| {
                session
                    .connection(&identity)
                    .is_none_or(|connection| connection.is_active())
            })
            .await;

        if !driver.session.is_active(&identity) {
            let reason = if settled {
                driver
                    .host
                    .last_notice()
                    .unwrap_or("Server stopped during initialization")
                    .to_string()
            } else {
                format!(
                    "Timed out after {}s waiting for {} to initialize",
                    driver.settings.request_timeout_secs, identity
                )
            };
            driver.finish().await;
            bail!(reason);
        }

        driver.dispatch(Action::ViewOpened {
            view: VIEW,
            path: driver.file.clone(),
        });
        driver.dispatch(Action::ViewFocused { view: VIEW });
        Ok(driver)
    }

    fn request_deadline(&self) -> Instant {
        Instant::now() + Duration::from_secs(self.settings.request_timeout_secs)
    }

    fn dispatch(&mut self, action: Action) {
        self.session.dispatch(action, &mut self.host);
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn host(&self) -> &CliHost {
        &self.host
    }

    /// Current text of the driven file
    pub fn text(&self) -> String {
        self.host
            .buffer(&self.file)
            .map(|snapshot| snapshot.text)
            .unwrap_or_default()
    }

    /// Byte offset of a 1-indexed line and column
    pub fn offset(&self, line: u32, column: u32) -> usize {
        Position::from_cli(line, column).to_offset(&self.text())
    }

    /// Issue one request and wait for whatever the session answers with
    pub async fn request(
        &mut self,
        kind: RequestKind,
        cursor: usize,
        selection: Option<(usize, usize)>,
    ) -> Result<Answer> {
        let snapshot = BufferSnapshot {
            text: self.text(),
            cursor,
            selection,
        };
        self.host.set_buffer(&self.file, snapshot);

        let mark = self.host.answers.len();
        self.dispatch(Action::Request {
            kind,
            path: self.file.clone(),
        });

        let deadline = self.request_deadline();
        let answered = self
            .session
            .run_until(&mut self.host, deadline, |_, host| host.answers.len() > mark)
            .await;
        if !answered {
            bail!(
                "Timed out after {}s waiting for {}",
                self.settings.request_timeout_secs,
                self.identity
            );
        }
        self.host.answers[mark].clone().into_result()
    }

    /// Wait for the server's first diagnostics publication; false on timeout
    pub async fn wait_diagnostics(&mut self) -> bool {
        let identity = self.identity.clone();
        let deadline = Instant::now() + Duration::from_secs(self.settings.diagnostics_wait_secs);
        self.session
            .run_until(&mut self.host, deadline, |session, host| {
                host.publications > 0 || !session.is_active(&identity)
            })
            .await
    }

    /// Diagnostics covering a 1-indexed line
    pub fn line_diagnostics(&mut self, line: u32) -> Result<Answer> {
        let mark = self.host.answers.len();
        self.dispatch(Action::LineDiagnostics {
            path: self.file.clone(),
            line: line.saturating_sub(1),
        });
        match self.host.answers.get(mark) {
            Some(answer) => answer.clone().into_result(),
            None => bail!("No answer for line {line}"),
        }
    }

    /// Stop every server and collect what the session saw
    pub async fn finish(&mut self) -> SessionReport {
        self.dispatch(Action::StopAll);
        let limit = Duration::from_millis(self.settings.shutdown_grace_ms) + Duration::from_secs(1);
        self.session.reap(limit).await;
        self.session.drain(&mut self.host);

        SessionReport {
            server: self.identity.clone(),
            server_info: self.host.server_info.clone(),
            messages: std::mem::take(&mut self.host.messages),
            log: self
                .show_log
                .then(|| self.session.server_log(&self.identity).map(str::to_string))
                .flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ServerConfig;
    use crate::models::diagnostic::DiagnosticSeverity;

    fn rendered(text: &str) -> RenderedDiagnostic {
        RenderedDiagnostic {
            severity: DiagnosticSeverity::Warning,
            text: text.to_string(),
            line: 0,
            start: 0,
            end: 1,
        }
    }

    #[test]
    fn test_host_tracks_cli_view_only() {
        let mut host = CliHost::default();
        host.set_diagnostics(ViewId(7), "clangd", &[rendered("elsewhere")]);
        assert!(host.diagnostics().is_empty());
        assert_eq!(host.publications, 0);

        host.set_diagnostics(VIEW, "clangd", &[rendered("unused")]);
        assert_eq!(host.diagnostics()["clangd"][0].text, "unused");

        host.set_diagnostics(VIEW, "clangd", &[]);
        assert!(host.diagnostics().is_empty());
        assert_eq!(host.publications, 2);
    }

    #[test]
    fn test_host_records_answers_in_order() {
        let mut host = CliHost::default();
        let path = Path::new("/tmp/a.c");
        host.notify(NoticeLevel::Info, "No hover information");
        host.replace_document(path, "int x;\n", 3);
        host.dismiss_completion();

        assert_eq!(host.answers().len(), 2);
        assert_eq!(host.last_notice(), Some("No hover information"));
        assert_eq!(host.buffer(path).unwrap().cursor, 3);
    }

    #[test]
    fn test_failure_notices_become_errors() {
        let warning = Answer::Notice {
            level: NoticeLevel::Warning,
            message: "No active server supports 'hover'".into(),
        };
        let err = warning.into_result().unwrap_err();
        assert_eq!(err.to_string(), "No active server supports 'hover'");

        let info = Answer::Notice {
            level: NoticeLevel::Info,
            message: "No location found".into(),
        };
        assert!(info.into_result().is_ok());
    }

    #[test]
    fn test_start_target_selection() {
        let mut pylsp = ServerConfig::new("pylsp", vec!["-v".into()]);
        pylsp.name = "py".into();
        pylsp.file_types = vec!["python".into()];
        let catalog = ServerCatalog::new(vec![pylsp]);

        let target = start_target(&catalog, Some("py"), Path::new("x.txt")).unwrap();
        assert_eq!(
            target,
            StartTarget::Command {
                name: Some("py".into()),
                command: "pylsp".into(),
                args: vec!["-v".into()],
            }
        );

        let target = start_target(&catalog, Some("my-ls --stdio"), Path::new("x.txt")).unwrap();
        assert_eq!(
            target,
            StartTarget::Command {
                name: None,
                command: "my-ls".into(),
                args: vec!["--stdio".into()],
            }
        );

        let target = start_target(&catalog, None, Path::new("src/app.py")).unwrap();
        assert_eq!(target, StartTarget::FileType("python".into()));

        assert!(start_target(&catalog, None, Path::new("notes")).is_err());
    }
}

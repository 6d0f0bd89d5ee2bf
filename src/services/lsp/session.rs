//! LSP session
//!
//! Single-threaded event loop over one inbox. Subprocess output, exits and
//! host actions all arrive as `Event`s and are handled one at a time, so
//! no protocol state is ever shared between tasks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::diagnostics::DiagnosticsStore;
use super::edits::apply_text_edits;
use super::interpreters::{
    HoverOutcome, filter_quirky, interpret_completion, interpret_document_symbols, interpret_edits,
    interpret_hover, interpret_initialize, interpret_location, interpret_references, word_prefix,
};
use super::logs::ServerLog;
use super::views::{ViewBindings, ViewId};
use crate::error::{InterpretError, LspError, NoticeLevel};
use crate::infra::lsp::capabilities::{Capability, CapabilityRegistry, TextDocumentSyncKind};
use crate::infra::lsp::client::{Connection, Inbound};
use crate::infra::lsp::correlator::PendingRequest;
use crate::infra::lsp::documents::ContentChange;
use crate::infra::lsp::manager::ConnectionRegistry;
use crate::infra::lsp::process::{ConnectionId, EventSink, Launcher, ServerEvent, ServerProcess};
use crate::infra::lsp::protocol::{
    MessageType, Method, PublishDiagnosticsParams, ResponseError, ServerInfo, ServerNotification,
};
use crate::infra::lsp::servers::{ServerCatalog, language_id_for_path};
use crate::models::config::{LspSettings, ServerConfig};
use crate::models::diagnostic::{Diagnostic, RenderedDiagnostic};
use crate::models::lsp::{Location, LocationEntry, Position, Range, path_to_uri, uri_to_path};

// ============================================================================
// Events and actions
// ============================================================================

/// Everything the session reacts to
#[derive(Debug)]
pub enum Event {
    Stdout {
        connection: ConnectionId,
        bytes: Vec<u8>,
    },
    Stderr {
        connection: ConnectionId,
        bytes: Vec<u8>,
    },
    Exited {
        connection: ConnectionId,
        code: Option<i32>,
    },
    Action(Action),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTarget {
    /// Explicit program; a known program keeps its configured settings
    Command {
        name: Option<String>,
        command: String,
        args: Vec<String>,
    },
    /// The configured server for a language id
    FileType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Hover,
    Format,
    RangeFormat,
    Completion,
    Definition,
    Declaration,
    TypeDefinition,
    Implementation,
    References,
    DocumentSymbols,
}

impl RequestKind {
    /// Answered with edits to the requested document
    pub fn rewrites_document(&self) -> bool {
        matches!(self, Self::Format | Self::RangeFormat)
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Hover => Capability::Hover,
            Self::Format => Capability::Formatting,
            Self::RangeFormat => Capability::RangeFormatting,
            Self::Completion => Capability::Completion,
            Self::Definition => Capability::Definition,
            Self::Declaration => Capability::Declaration,
            Self::TypeDefinition => Capability::TypeDefinition,
            Self::Implementation => Capability::Implementation,
            Self::References => Capability::References,
            Self::DocumentSymbols => Capability::DocumentSymbol,
        }
    }
}

/// Host-triggered actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start(StartTarget),
    Stop { identity: String },
    StopAll,
    ShowLog { identity: String },
    ViewOpened { view: ViewId, path: PathBuf },
    ViewFocused { view: ViewId },
    ViewClosed { view: ViewId },
    Edited {
        path: PathBuf,
        changes: Vec<ContentChange>,
    },
    Saved { path: PathBuf },
    Resync { path: PathBuf },
    Request { kind: RequestKind, path: PathBuf },
    LineDiagnostics { path: PathBuf, line: u32 },
}

// ============================================================================
// Host seam
// ============================================================================

/// Current state of a host buffer; offsets are bytes into `text`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BufferSnapshot {
    pub text: String,
    pub cursor: usize,
    pub selection: Option<(usize, usize)>,
}

impl BufferSnapshot {
    pub fn new(text: impl Into<String>, cursor: usize) -> Self {
        Self {
            text: text.into(),
            cursor,
            selection: None,
        }
    }
}

/// The editor side of the session
pub trait Host {
    fn buffer(&self, path: &Path) -> Option<BufferSnapshot>;

    fn notify(&mut self, level: NoticeLevel, message: &str);

    fn connected(&mut self, identity: &str, server: Option<&ServerInfo>);

    /// `window/showMessage` and `window/showMessageRequest`
    fn server_message(&mut self, identity: &str, level: MessageType, message: &str);

    fn show_text(&mut self, title: &str, text: &str);

    fn open_location(&mut self, location: &Location);

    fn replace_document(&mut self, path: &Path, text: &str, cursor: usize);

    fn show_completions(&mut self, items: &[String]);

    fn dismiss_completion(&mut self);

    fn show_locations(&mut self, title: &str, entries: &[LocationEntry]);

    /// Replace what one connection shows in a view; empty clears it
    fn set_diagnostics(&mut self, view: ViewId, identity: &str, diagnostics: &[RenderedDiagnostic]);
}

fn report(host: &mut dyn Host, err: &LspError) {
    host.notify(err.notice_level(), &err.to_string());
}

/// Does this server take documents at this path
fn serves(config: &ServerConfig, path: &Path) -> bool {
    match language_id_for_path(path) {
        Some(language) => config.handles(language),
        None => config.file_types.is_empty(),
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    root: PathBuf,
    settings: LspSettings,
    catalog: ServerCatalog,
    launcher: Box<dyn Launcher>,
    connections: ConnectionRegistry,
    capabilities: CapabilityRegistry,
    diagnostics: DiagnosticsStore,
    views: ViewBindings,
    focused: Option<ViewId>,
    logs: HashMap<String, ServerLog>,
    retired: Vec<ServerProcess>,
    next_connection: u64,
    sender: mpsc::UnboundedSender<Event>,
    inbox: mpsc::UnboundedReceiver<Event>,
}

impl Session {
    pub fn new(
        root: PathBuf,
        settings: LspSettings,
        catalog: ServerCatalog,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        Self {
            root,
            settings,
            catalog,
            launcher,
            connections: ConnectionRegistry::new(),
            capabilities: CapabilityRegistry::new(),
            diagnostics: DiagnosticsStore::new(),
            views: ViewBindings::new(),
            focused: None,
            logs: HashMap::new(),
            retired: Vec::new(),
            next_connection: 1,
            sender,
            inbox,
        }
    }

    /// Handle for posting actions from outside the loop
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }

    pub fn connection(&self, identity: &str) -> Option<&Connection> {
        self.connections.get(identity)
    }

    pub fn identities(&self) -> Vec<String> {
        self.connections.identities()
    }

    pub fn is_active(&self, identity: &str) -> bool {
        self.connections.get(identity).is_some_and(Connection::is_active)
    }

    pub fn server_log(&self, identity: &str) -> Option<&str> {
        self.logs.get(identity).map(ServerLog::text)
    }

    pub fn diagnostics(&self) -> &DiagnosticsStore {
        &self.diagnostics
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub async fn next_event(&mut self) -> Option<Event> {
        self.inbox.recv().await
    }

    /// Process events until `done` holds or the deadline passes; true if `done` held
    pub async fn run_until<H: Host>(
        &mut self,
        host: &mut H,
        deadline: Instant,
        mut done: impl FnMut(&Self, &H) -> bool,
    ) -> bool {
        loop {
            if done(self, host) {
                return true;
            }
            match tokio::time::timeout_at(deadline, self.inbox.recv()).await {
                Ok(Some(event)) => self.handle(event, host),
                Ok(None) | Err(_) => return false,
            }
        }
    }

    /// Handle whatever is already queued without waiting
    pub fn drain(&mut self, host: &mut dyn Host) {
        while let Ok(event) = self.inbox.try_recv() {
            self.handle(event, host);
        }
    }

    /// Wait for retired processes to go away
    pub async fn reap(&mut self, limit: Duration) {
        let retired = std::mem::take(&mut self.retired);
        futures::future::join_all(retired.into_iter().map(|process| process.wait(limit))).await;
    }

    pub fn dispatch(&mut self, action: Action, host: &mut dyn Host) {
        self.handle(Event::Action(action), host);
    }

    pub fn handle(&mut self, event: Event, host: &mut dyn Host) {
        match event {
            Event::Stdout { connection, bytes } => self.on_stdout(connection, &bytes, host),
            Event::Stderr { connection, bytes } => self.on_stderr(connection, &bytes),
            Event::Exited { connection, code } => self.on_exit(connection, code, host),
            Event::Action(action) => self.on_action(action, host),
        }
    }

    fn on_action(&mut self, action: Action, host: &mut dyn Host) {
        let result = match action {
            Action::Start(target) => self.start(target, host),
            Action::Stop { identity } => self.stop(&identity, host),
            Action::StopAll => {
                for identity in self.connections.identities() {
                    self.stop(&identity, host).ok();
                }
                Ok(())
            }
            Action::ShowLog { identity } => match self.logs.get(&identity) {
                Some(log) => {
                    host.show_text(&format!("{identity} log"), log.text());
                    Ok(())
                }
                None => Err(LspError::UnknownServer(identity)),
            },
            Action::ViewOpened { view, path } => {
                self.view_opened(view, path, host);
                Ok(())
            }
            Action::ViewFocused { view } => {
                self.focused = Some(view);
                if let Some(path) = self.views.path_of(view).map(Path::to_path_buf) {
                    self.open_everywhere(&path, host);
                }
                Ok(())
            }
            Action::ViewClosed { view } => {
                self.view_closed(view);
                Ok(())
            }
            Action::Edited { path, changes } => {
                self.sync_changes(&path, &changes, host);
                Ok(())
            }
            Action::Saved { path } => {
                self.saved(&path, host);
                Ok(())
            }
            Action::Resync { path } => match host.buffer(&path) {
                Some(snapshot) => {
                    self.sync_changes(&path, &[ContentChange::full(snapshot.text)], host);
                    Ok(())
                }
                None => Err(LspError::NoBuffer(format!("No buffer for {}", path.display()))),
            },
            Action::Request { kind, path } => self.request(kind, &path, host),
            Action::LineDiagnostics { path, line } => {
                self.line_diagnostics(&path, line, host);
                Ok(())
            }
        };

        if let Err(e) = result {
            report(host, &e);
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn start(&mut self, target: StartTarget, host: &mut dyn Host) -> Result<(), LspError> {
        let config = match target {
            StartTarget::Command {
                name,
                command,
                args,
            } => self.catalog.for_command(name.as_deref(), &command, args),
            StartTarget::FileType(language) => self
                .catalog
                .for_language(&language)
                .cloned()
                .ok_or(LspError::NoServerForLanguage(language))?,
        };

        let identity = config.identity().to_string();
        self.connections.ensure_available(&identity)?;

        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        let sink = self.event_sink();
        let link = self.launcher.launch(id, &config, &self.root, sink)?;

        self.logs.insert(
            identity.clone(),
            ServerLog::new(id, self.settings.stderr_log_limit),
        );
        let root = self.root.clone();
        let connection = self.connections.insert(Connection::new(id, config, link))?;
        if let Err(e) = connection.initialize(&root) {
            self.teardown(&identity, host);
            return Err(e);
        }
        tracing::info!("{} starting ({})", identity, id);
        Ok(())
    }

    fn event_sink(&self) -> EventSink {
        let sender = self.sender.clone();
        Arc::new(move |connection, event| {
            let event = match event {
                ServerEvent::Stdout(bytes) => Event::Stdout { connection, bytes },
                ServerEvent::Stderr(bytes) => Event::Stderr { connection, bytes },
                ServerEvent::Exited(code) => Event::Exited { connection, code },
            };
            let _ = sender.send(event);
        })
    }

    fn stop(&mut self, identity: &str, host: &mut dyn Host) -> Result<(), LspError> {
        let connection = self
            .connections
            .get_mut(identity)
            .ok_or_else(|| LspError::UnknownServer(identity.to_string()))?;
        connection.shutdown();
        self.teardown(identity, host);
        Ok(())
    }

    /// Forget everything about a connection. Safe to call more than once.
    fn teardown(&mut self, identity: &str, host: &mut dyn Host) {
        let Some(mut connection) = self.connections.remove(identity) else {
            return;
        };
        let grace = Duration::from_millis(self.settings.shutdown_grace_ms);
        if let Some(process) = connection.terminate(grace) {
            self.retired.push(process);
        }
        self.capabilities.remove(identity);

        for path in self.diagnostics.remove_connection(identity) {
            for view in self.views.views_of(&path) {
                host.set_diagnostics(*view, identity, &[]);
            }
        }
    }

    fn on_exit(&mut self, id: ConnectionId, code: Option<i32>, host: &mut dyn Host) {
        let Some(connection) = self.connections.find_by_id(id) else {
            tracing::debug!("Exit of retired connection {}", id);
            return;
        };
        let identity = connection.identity().to_string();
        report(
            host,
            &LspError::ServerTerminated {
                identity: identity.clone(),
                code,
            },
        );
        self.teardown(&identity, host);
    }

    fn on_stderr(&mut self, id: ConnectionId, bytes: &[u8]) {
        match self.logs.values_mut().find(|log| log.connection() == id) {
            Some(log) => log.append(bytes),
            None => tracing::debug!("Dropping stderr of unknown connection {}", id),
        }
    }

    fn on_stdout(&mut self, id: ConnectionId, bytes: &[u8], host: &mut dyn Host) {
        let Some(connection) = self.connections.find_by_id(id) else {
            tracing::debug!("Dropping output of retired connection {}", id);
            return;
        };
        let identity = connection.identity().to_string();
        for inbound in connection.receive(bytes) {
            // An earlier message may have torn the connection down
            if self.connections.get(&identity).is_none_or(|c| c.id() != id) {
                break;
            }
            self.on_inbound(&identity, inbound, host);
        }
    }

    fn on_inbound(&mut self, identity: &str, inbound: Inbound, host: &mut dyn Host) {
        match inbound {
            Inbound::Response { request, outcome } => match outcome {
                Ok(result) => self.on_result(identity, request, result, host),
                Err(err) => self.on_error(identity, request, err, host),
            },
            Inbound::Notification(ServerNotification::PublishDiagnostics(params)) => {
                self.on_diagnostics(identity, params, host)
            }
            Inbound::Notification(ServerNotification::LogMessage(params)) => {
                match params.message_type() {
                    MessageType::Error => tracing::error!("{}: {}", identity, params.message),
                    MessageType::Warning => tracing::warn!("{}: {}", identity, params.message),
                    MessageType::Info => tracing::info!("{}: {}", identity, params.message),
                    MessageType::Log => tracing::debug!("{}: {}", identity, params.message),
                }
            }
            Inbound::Notification(ServerNotification::ShowMessage(params))
            | Inbound::MessageRequest(params) => {
                host.server_message(identity, params.message_type(), &params.message)
            }
            Inbound::Notification(ServerNotification::Unknown(method)) => {
                tracing::debug!("{}: ignoring {}", identity, method)
            }
        }
    }

    fn on_error(
        &mut self,
        identity: &str,
        request: PendingRequest,
        err: ResponseError,
        host: &mut dyn Host,
    ) {
        let method = request.method;
        let err = LspError::server_error(method, err);
        match method {
            Method::Initialize => self.teardown(identity, host),
            Method::Completion => host.dismiss_completion(),
            Method::Shutdown => {
                tracing::debug!("{}: {}", identity, err);
                return;
            }
            _ => {}
        }
        report(host, &err);
    }

    fn on_initialized(&mut self, identity: &str, result: Value, host: &mut dyn Host) {
        let (capabilities, server_info) = match interpret_initialize(&result) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.teardown(identity, host);
                report(host, &LspError::Protocol(format!("{identity} initialize: {e}")));
                return;
            }
        };

        let Some(connection) = self.connections.get_mut(identity) else {
            return;
        };
        if let Err(e) = connection.activate() {
            self.teardown(identity, host);
            report(host, &e);
            return;
        }
        self.capabilities.register(identity, capabilities);
        tracing::info!("{} initialized", identity);
        host.connected(identity, server_info.as_ref());

        let focused = self
            .focused
            .and_then(|view| self.views.path_of(view))
            .map(Path::to_path_buf);
        if let Some(path) = focused {
            self.open_document(identity, &path, host);
        }
    }

    // ------------------------------------------------------------------------
    // Documents and views
    // ------------------------------------------------------------------------

    fn open_document(&mut self, identity: &str, path: &Path, host: &mut dyn Host) {
        let Some(connection) = self.connections.get_mut(identity) else {
            return;
        };
        if !connection.is_active()
            || connection.documents().is_open(path)
            || !serves(connection.config(), path)
        {
            return;
        }
        let Some(snapshot) = host.buffer(path) else {
            tracing::debug!("No buffer for {}, not opening", path.display());
            return;
        };

        let language = language_id_for_path(path).unwrap_or("plaintext");
        if let Some(open) = connection.documents_mut().open(path, &snapshot.text, language)
            && let Err(e) = connection.notify(open)
        {
            tracing::warn!("{}: didOpen failed: {}", identity, e);
        }
    }

    fn open_everywhere(&mut self, path: &Path, host: &mut dyn Host) {
        for identity in self.connections.identities() {
            self.open_document(&identity, path, host);
        }
    }

    fn view_opened(&mut self, view: ViewId, path: PathBuf, host: &mut dyn Host) {
        if self.views.path_of(view).is_some_and(|bound| bound != path) {
            self.view_closed(view);
        }
        if self.views.bind(view, &path) {
            self.open_everywhere(&path, host);
        }

        let text = host.buffer(&path).map(|snapshot| snapshot.text);
        for (identity, list) in self.diagnostics.for_path(&path) {
            let rendered: Vec<RenderedDiagnostic> =
                list.iter().map(|d| d.render(text.as_deref())).collect();
            host.set_diagnostics(view, identity, &rendered);
        }
    }

    /// The last view of a document closes it on every connection
    fn view_closed(&mut self, view: ViewId) {
        if self.focused == Some(view) {
            self.focused = None;
        }
        let Some((path, last)) = self.views.unbind(view) else {
            return;
        };
        if !last {
            return;
        }

        for identity in self.connections.identities() {
            let Some(connection) = self.connections.get_mut(&identity) else {
                continue;
            };
            if let Some(close) = connection.documents_mut().close(&path)
                && let Err(e) = connection.notify(close)
            {
                tracing::warn!("{}: didClose failed: {}", identity, e);
            }
        }
        self.diagnostics.remove_path(&path);
    }

    /// Forward a change to every connection with the document open, in the
    /// form its sync kind asks for
    fn sync_changes(&mut self, path: &Path, changes: &[ContentChange], host: &mut dyn Host) {
        let mut full_text: Option<Option<String>> = None;

        for identity in self.connections.identities() {
            let kind = self.capabilities.sync(&identity).change;
            let Some(connection) = self.connections.get_mut(&identity) else {
                continue;
            };
            if !connection.is_active() || !connection.documents().is_open(path) {
                continue;
            }

            let replaced;
            let outgoing: &[ContentChange] = match kind {
                TextDocumentSyncKind::None => continue,
                TextDocumentSyncKind::Incremental => changes,
                TextDocumentSyncKind::Full => match changes {
                    [ContentChange::Full { .. }] => changes,
                    _ => {
                        let text = full_text
                            .get_or_insert_with(|| host.buffer(path).map(|snapshot| snapshot.text));
                        let Some(text) = text else {
                            tracing::debug!("No buffer for {}, change not sent", path.display());
                            continue;
                        };
                        replaced = [ContentChange::full(text.clone())];
                        &replaced
                    }
                },
            };

            if let Some(change) = connection.documents_mut().change(path, outgoing)
                && let Err(e) = connection.notify(change)
            {
                tracing::warn!("{}: didChange failed: {}", identity, e);
            }
        }
    }

    fn saved(&mut self, path: &Path, host: &mut dyn Host) {
        let mut text: Option<Option<String>> = None;

        for identity in self.connections.identities() {
            let include_text = self.capabilities.sync(&identity).include_text;
            let Some(connection) = self.connections.get_mut(&identity) else {
                continue;
            };
            if !connection.is_active() || !serves(connection.config(), path) {
                continue;
            }

            let body = if include_text {
                text.get_or_insert_with(|| host.buffer(path).map(|snapshot| snapshot.text))
                    .as_deref()
            } else {
                None
            };
            let save = connection.documents().save(path, body);
            if let Err(e) = connection.notify(save) {
                tracing::warn!("{}: didSave failed: {}", identity, e);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    fn on_diagnostics(
        &mut self,
        identity: &str,
        params: PublishDiagnosticsParams,
        host: &mut dyn Host,
    ) {
        let path = uri_to_path(&params.uri);
        let Some(tracked) = self
            .connections
            .get(identity)
            .and_then(|c| c.documents().version(&path))
        else {
            tracing::debug!("{}: diagnostics for unopened {}", identity, path.display());
            return;
        };
        if let Some(version) = params.version
            && version != tracked
        {
            tracing::debug!(
                "{}: stale diagnostics for {} (v{} != v{})",
                identity,
                path.display(),
                version,
                tracked
            );
            return;
        }

        let diagnostics: Vec<Diagnostic> =
            params.diagnostics.into_iter().map(Diagnostic::from).collect();
        self.diagnostics.replace(identity, &path, diagnostics);

        let views = self.views.views_of(&path);
        if views.is_empty() {
            return;
        }
        let text = host.buffer(&path).map(|snapshot| snapshot.text);
        let rendered: Vec<RenderedDiagnostic> = self
            .diagnostics
            .get(identity, &path)
            .iter()
            .map(|d| d.render(text.as_deref()))
            .collect();
        for view in views {
            host.set_diagnostics(*view, identity, &rendered);
        }
    }

    fn line_diagnostics(&self, path: &Path, line: u32, host: &mut dyn Host) {
        let text = host.buffer(path).map(|snapshot| snapshot.text);
        let lines: Vec<String> = self
            .diagnostics
            .covering_line(path, line)
            .into_iter()
            .map(|(identity, d)| format!("{identity}: {}", d.render(text.as_deref())))
            .collect();

        if lines.is_empty() {
            host.notify(
                NoticeLevel::Info,
                &format!("No diagnostics on line {}", line + 1),
            );
        } else {
            host.show_text("Diagnostics", &lines.join("\n"));
        }
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    fn request(&mut self, kind: RequestKind, path: &Path, host: &mut dyn Host) -> Result<(), LspError> {
        let capability = kind.capability();
        let serving: Vec<String> = self
            .connections
            .active()
            .filter(|c| serves(c.config(), path))
            .map(|c| c.identity().to_string())
            .collect();
        if serving.is_empty() {
            return Err(LspError::NoActiveServer {
                path: path.display().to_string(),
            });
        }

        let mut targets: Vec<String> = serving
            .into_iter()
            .filter(|identity| self.capabilities.supports(identity, capability))
            .collect();
        if targets.is_empty() {
            return Err(LspError::FeatureNotSupported {
                feature: capability.display_name().to_string(),
            });
        }
        targets.sort();
        // One rewrite per request: edits only fit the text they were computed on
        if kind.rewrites_document() {
            targets.truncate(1);
        }

        let snapshot = host
            .buffer(path)
            .ok_or_else(|| LspError::NoBuffer(format!("No buffer for {}", path.display())))?;
        let params = self.request_params(kind, path, &snapshot);

        for identity in targets {
            self.open_document(&identity, path, host);
            if let Some(connection) = self.connections.get_mut(&identity) {
                connection.send_request(
                    capability.method(),
                    params.clone(),
                    Some(path.to_path_buf()),
                )?;
            }
        }
        Ok(())
    }

    fn request_params(&self, kind: RequestKind, path: &Path, snapshot: &BufferSnapshot) -> Value {
        let text_document = json!({ "uri": path_to_uri(path) });
        let position = Position::from_offset(&snapshot.text, snapshot.cursor);
        let options = json!({
            "tabSize": self.settings.tab_size,
            "insertSpaces": self.settings.insert_spaces
        });

        match kind {
            RequestKind::Format => json!({ "textDocument": text_document, "options": options }),
            RequestKind::RangeFormat => {
                let range = match snapshot.selection {
                    Some((start, end)) => Range::new(
                        Position::from_offset(&snapshot.text, start.min(end)),
                        Position::from_offset(&snapshot.text, start.max(end)),
                    ),
                    None => Range::new(
                        Position::new(position.line, 0),
                        Position::new(position.line + 1, 0),
                    ),
                };
                json!({ "textDocument": text_document, "range": range, "options": options })
            }
            RequestKind::DocumentSymbols => json!({ "textDocument": text_document }),
            RequestKind::References => json!({
                "textDocument": text_document,
                "position": position,
                "context": { "includeDeclaration": true }
            }),
            RequestKind::Hover
            | RequestKind::Completion
            | RequestKind::Definition
            | RequestKind::Declaration
            | RequestKind::TypeDefinition
            | RequestKind::Implementation => {
                json!({ "textDocument": text_document, "position": position })
            }
        }
    }

    fn on_result(
        &mut self,
        identity: &str,
        request: PendingRequest,
        result: Value,
        host: &mut dyn Host,
    ) {
        let method = request.method;
        let outcome = match method {
            Method::Initialize => {
                self.on_initialized(identity, result, host);
                Ok(())
            }
            Method::Shutdown => Ok(()),
            Method::Hover => {
                match interpret_hover(&result) {
                    HoverOutcome::Text(text) => host.show_text("Hover", &text),
                    HoverOutcome::Empty => host.notify(NoticeLevel::Info, "No hover information"),
                    HoverOutcome::Unrecognized => {
                        tracing::debug!("{}: unrecognized hover {}", identity, result);
                        host.notify(NoticeLevel::Info, "Unrecognized hover content");
                    }
                }
                Ok(())
            }
            Method::Formatting | Method::RangeFormatting => {
                self.on_formatting(request.document.as_deref(), &result, host)
            }
            Method::Completion => self.on_completion(identity, request.document.as_deref(), &result, host),
            Method::Definition
            | Method::Declaration
            | Method::TypeDefinition
            | Method::Implementation => interpret_location(&result).map(|found| match found {
                Some(location) => host.open_location(&location),
                None => host.notify(NoticeLevel::Info, "No location found"),
            }),
            Method::References => interpret_references(&result).map(|locations| {
                if locations.is_empty() {
                    host.notify(NoticeLevel::Info, "No references found");
                    return;
                }
                let entries: Vec<LocationEntry> = locations
                    .into_iter()
                    .map(|location| {
                        let (line, column) = location.range.start.to_display();
                        LocationEntry {
                            label: format!("{}:{}:{}", location.path.display(), line, column),
                            location,
                        }
                    })
                    .collect();
                host.show_locations("References", &entries);
            }),
            Method::DocumentSymbol => {
                let document = request.document.clone().unwrap_or_default();
                interpret_document_symbols(&result, &document)
                    .map(|entries| host.show_locations("Symbols", &entries))
            }
        };

        if let Err(e) = outcome {
            if method == Method::Completion {
                host.dismiss_completion();
            }
            report(host, &LspError::Protocol(format!("{method} from {identity}: {e}")));
        }
    }

    fn on_formatting(
        &mut self,
        document: Option<&Path>,
        result: &Value,
        host: &mut dyn Host,
    ) -> Result<(), InterpretError> {
        let edits = interpret_edits(result)?;
        let Some(path) = document else {
            return Ok(());
        };
        if edits.is_empty() {
            host.notify(NoticeLevel::Info, "Already formatted");
            return Ok(());
        }
        let Some(snapshot) = host.buffer(path) else {
            report(
                host,
                &LspError::NoBuffer(format!("No buffer for {}", path.display())),
            );
            return Ok(());
        };

        let outcome = apply_text_edits(&snapshot.text, &edits, snapshot.cursor);
        host.replace_document(path, &outcome.text, outcome.cursor);
        self.sync_changes(path, &[ContentChange::full(outcome.text)], host);
        Ok(())
    }

    fn on_completion(
        &mut self,
        identity: &str,
        document: Option<&Path>,
        result: &Value,
        host: &mut dyn Host,
    ) -> Result<(), InterpretError> {
        let mut items = interpret_completion(result)?;

        let quirky = self
            .connections
            .get(identity)
            .is_some_and(|c| c.config().completion_quirks);
        if quirky && let Some(snapshot) = document.and_then(|path| host.buffer(path)) {
            let prefix = word_prefix(&snapshot.text, snapshot.cursor);
            items = filter_quirky(items, prefix);
        }

        if items.is_empty() {
            host.dismiss_completion();
            host.notify(NoticeLevel::Info, "No completions");
        } else {
            host.show_completions(&items);
        }
        Ok(())
    }
}

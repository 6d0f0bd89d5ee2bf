//! One language server connection
//!
//! Owns the subprocess link together with its framer, correlator and
//! open-document table. Nothing here blocks: requests are written and
//! forgotten, and responses come back through `receive`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::correlator::{Correlator, PendingRequest};
use super::documents::DocumentSync;
use super::framer::{Framer, encode};
use super::process::{ConnectionId, Outbound, ServerLink, ServerProcess};
use super::protocol::{
    ClientInfo, InitializeParams, Message, MessageParams, Method, Notification, Request,
    Response, ResponseError, ServerNotification, client_capabilities, error_codes,
    methods,
};
use crate::error::LspError;
use crate::models::config::ServerConfig;
use crate::models::lsp::path_to_uri;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Spawned, initialize sent, no answer yet
    Pending,
    Active,
    Stopped,
}

/// A decoded message the session has to act on
#[derive(Debug)]
pub enum Inbound {
    Response {
        request: PendingRequest,
        outcome: Result<Value, ResponseError>,
    },
    Notification(ServerNotification),
    /// `window/showMessageRequest`; already answered with null
    MessageRequest(MessageParams),
}

pub struct Connection {
    id: ConnectionId,
    config: ServerConfig,
    state: ConnectionState,
    framer: Framer,
    correlator: Correlator,
    documents: DocumentSync,
    outbound: Outbound,
    process: Option<ServerProcess>,
}

impl Connection {
    pub fn new(id: ConnectionId, config: ServerConfig, link: ServerLink) -> Self {
        Self {
            id,
            config,
            state: ConnectionState::Pending,
            framer: Framer::new(),
            correlator: Correlator::new(),
            documents: DocumentSync::new(),
            outbound: link.outbound,
            process: link.process,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &str {
        self.config.identity()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }

    pub fn documents(&self) -> &DocumentSync {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut DocumentSync {
        &mut self.documents
    }

    /// Send the initialize request; the connection stays pending until it is answered
    pub fn initialize(&mut self, root: &Path) -> Result<u64, LspError> {
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_uri: Some(path_to_uri(root)),
            capabilities: client_capabilities(),
            client_info: Some(ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            initialization_options: self.config.initialization_options.clone(),
        };
        self.send_request(Method::Initialize, serde_json::to_value(params)?, None)
    }

    /// Handshake answered: send `initialized` and push configured settings once
    pub fn activate(&mut self) -> Result<(), LspError> {
        self.state = ConnectionState::Active;
        self.notify(Notification::new(methods::INITIALIZED, None))?;

        if let Some(settings) = self.config.settings.clone() {
            self.notify(Notification::new(
                methods::DID_CHANGE_CONFIGURATION,
                Some(serde_json::json!({ "settings": settings })),
            ))?;
        }
        Ok(())
    }

    pub fn send_request(
        &mut self,
        method: Method,
        params: Value,
        document: Option<PathBuf>,
    ) -> Result<u64, LspError> {
        let id = self.correlator.register(method, document);
        let request = Request::new(id, method.as_str(), Some(params));
        if let Err(e) = self.write(&request) {
            self.correlator.discard(id);
            return Err(e);
        }
        tracing::debug!("{} request {} {}", self.identity(), id, method);
        Ok(id)
    }

    pub fn notify(&mut self, notification: Notification) -> Result<(), LspError> {
        self.write(&notification)
    }

    fn write<T: Serialize>(&self, message: &T) -> Result<(), LspError> {
        if self.state == ConnectionState::Stopped {
            return Err(LspError::NotConnected);
        }
        let frame = encode(message)?;
        self.outbound
            .send(frame)
            .map_err(|_| LspError::NotConnected)
    }

    /// Feed stdout bytes; server requests are answered here, everything
    /// else is handed back
    pub fn receive(&mut self, bytes: &[u8]) -> Vec<Inbound> {
        let values: Vec<_> = self.framer.feed(bytes).collect();
        let mut inbound = Vec::new();

        for value in values {
            let value = match value {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("{}: dropping bad frame: {}", self.identity(), e);
                    continue;
                }
            };

            match Message::from_value(value) {
                Ok(Message::Response(response)) => {
                    if let Some(item) = self.on_response(response) {
                        inbound.push(item);
                    }
                }
                Ok(Message::Notification(notification)) => {
                    match ServerNotification::parse(notification) {
                        Ok(ServerNotification::Unknown(method)) => {
                            tracing::debug!("{}: ignoring notification {}", self.identity(), method);
                        }
                        Ok(parsed) => inbound.push(Inbound::Notification(parsed)),
                        Err(e) => {
                            tracing::warn!("{}: malformed notification: {}", self.identity(), e)
                        }
                    }
                }
                Ok(Message::Request(request)) => {
                    if let Some(item) = self.on_server_request(request) {
                        inbound.push(item);
                    }
                }
                Err(e) => tracing::warn!("{}: invalid message: {}", self.identity(), e),
            }
        }
        inbound
    }

    fn on_response(&mut self, response: Response) -> Option<Inbound> {
        let Some(id) = response.id.clone() else {
            tracing::warn!(
                "{}: response without id: {:?}",
                self.identity(),
                response.error
            );
            return None;
        };
        let Some(request) = self.correlator.resolve(&id) else {
            tracing::debug!("{}: response for unknown id {:?}", self.identity(), id);
            return None;
        };
        Some(Inbound::Response {
            request,
            outcome: response.into_result(),
        })
    }

    fn on_server_request(&mut self, request: Request) -> Option<Inbound> {
        let mut surfaced = None;
        let result = match request.method.as_str() {
            methods::CONFIGURATION => Ok(self.configuration_items(&request.params)),
            methods::REGISTER_CAPABILITY
            | methods::UNREGISTER_CAPABILITY
            | methods::WORK_DONE_PROGRESS_CREATE => Ok(Value::Null),
            methods::SHOW_MESSAGE_REQUEST => {
                surfaced = serde_json::from_value(request.params.clone())
                    .ok()
                    .map(Inbound::MessageRequest);
                Ok(Value::Null)
            }
            methods::APPLY_EDIT => Ok(serde_json::json!({ "applied": false })),
            _ => {
                tracing::debug!("{}: unhandled server request {}", self.identity(), request.method);
                Err(ResponseError {
                    code: error_codes::METHOD_NOT_FOUND,
                    message: format!("Method not found: {}", request.method),
                    data: None,
                })
            }
        };

        let response = match result {
            Ok(value) => Response::success(request.id, value),
            Err(error) => Response::failure(request.id, error),
        };
        if let Err(e) = self.write(&response) {
            tracing::debug!("{}: could not answer server request: {}", self.identity(), e);
        }
        surfaced
    }

    /// One entry per requested item, looked up by dotted section in the
    /// configured settings
    fn configuration_items(&self, params: &Value) -> Value {
        let items = params
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let answers = items
            .iter()
            .map(|item| {
                let section = item.get("section").and_then(Value::as_str);
                match (&self.config.settings, section) {
                    (Some(settings), Some(section)) => section
                        .split('.')
                        .try_fold(settings, |value, key| value.get(key))
                        .cloned()
                        .unwrap_or(Value::Null),
                    (Some(settings), None) => settings.clone(),
                    (None, _) => Value::Null,
                }
            })
            .collect();
        Value::Array(answers)
    }

    /// Polite stop: `shutdown` then `exit`; the process is retired separately
    pub fn shutdown(&mut self) {
        if self.state != ConnectionState::Active {
            return;
        }
        if self.send_request(Method::Shutdown, Value::Null, None).is_ok() {
            let _ = self.notify(Notification::new(methods::EXIT, None));
        }
    }

    /// Drop all protocol state and signal the process. Idempotent; the
    /// returned process handle is only produced once.
    pub fn terminate(&mut self, grace: Duration) -> Option<ServerProcess> {
        if self.state != ConnectionState::Stopped {
            tracing::info!("{} stopped", self.identity());
        }
        self.state = ConnectionState::Stopped;
        let dropped = self.correlator.clear();
        if dropped > 0 {
            tracing::debug!("{}: {} requests left unanswered", self.identity(), dropped);
        }
        self.documents.clear();

        let mut process = self.process.take()?;
        process.terminate(grace);
        Some(process)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("identity", &self.identity())
            .field("state", &self.state)
            .field("documents", &self.documents.len())
            .field("pending", &self.correlator.pending_count())
            .finish()
    }
}

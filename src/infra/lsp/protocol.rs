//! JSON-RPC 2.0 Protocol Implementation for LSP
//!
//! Defines the core message types for Language Server Protocol communication.
//! Domain types (Position, Range, TextEdit) are in models/lsp.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::lsp::Range;

// ============================================================================
// JSON-RPC 2.0 Core Types
// ============================================================================

/// JSON-RPC 2.0 Request
///
/// `params` is always serialized; servers differ on how they treat a missing field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(id),
            method: method.into(),
            params: params_or_empty(params),
        }
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: RequestId, error: ResponseError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Value, ResponseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC 2.0 Notification (no id, no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params: params_or_empty(params),
        }
    }
}

fn params_or_empty(params: Option<Value>) -> Value {
    match params {
        Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
        Some(value) => value,
    }
}

/// Request ID - can be number or string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl RequestId {
    /// Numeric form; servers occasionally echo our ids back as strings
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.parse().ok(),
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        RequestId::Number(id)
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;

    // LSP-specific error codes
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    pub const REQUEST_CANCELLED: i32 = -32800;
    pub const CONTENT_MODIFIED: i32 = -32801;
}

/// Incoming message from LSP server
#[derive(Debug, Clone)]
pub enum Message {
    Response(Response),
    Request(Request),
    Notification(Notification),
}

impl Message {
    /// Classify a decoded JSON body
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let has_id = value.get("id").is_some();
        let has_method = value.get("method").is_some();

        match (has_id, has_method) {
            (true, true) => Ok(Message::Request(serde_json::from_value(value)?)),
            (true, false) => Ok(Message::Response(serde_json::from_value(value)?)),
            (false, true) => Ok(Message::Notification(serde_json::from_value(value)?)),
            (false, false) => {
                use serde::de::Error;
                Err(serde_json::Error::custom("Invalid LSP message"))
            }
        }
    }
}

// ============================================================================
// Method Enumeration
// ============================================================================

/// Requests this client issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    Shutdown,
    Hover,
    Formatting,
    RangeFormatting,
    Completion,
    Definition,
    Declaration,
    TypeDefinition,
    Implementation,
    References,
    DocumentSymbol,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Shutdown => "shutdown",
            Self::Hover => "textDocument/hover",
            Self::Formatting => "textDocument/formatting",
            Self::RangeFormatting => "textDocument/rangeFormatting",
            Self::Completion => "textDocument/completion",
            Self::Definition => "textDocument/definition",
            Self::Declaration => "textDocument/declaration",
            Self::TypeDefinition => "textDocument/typeDefinition",
            Self::Implementation => "textDocument/implementation",
            Self::References => "textDocument/references",
            Self::DocumentSymbol => "textDocument/documentSymbol",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification and server-request method names
pub mod methods {
    pub const INITIALIZED: &str = "initialized";
    pub const EXIT: &str = "exit";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const DID_SAVE: &str = "textDocument/didSave";
    pub const DID_CLOSE: &str = "textDocument/didClose";
    pub const DID_CHANGE_CONFIGURATION: &str = "workspace/didChangeConfiguration";

    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
    pub const LOG_MESSAGE: &str = "window/logMessage";
    pub const SHOW_MESSAGE: &str = "window/showMessage";
    pub const SHOW_MESSAGE_REQUEST: &str = "window/showMessageRequest";
    pub const WORK_DONE_PROGRESS_CREATE: &str = "window/workDoneProgress/create";
    pub const CONFIGURATION: &str = "workspace/configuration";
    pub const APPLY_EDIT: &str = "workspace/applyEdit";
    pub const REGISTER_CAPABILITY: &str = "client/registerCapability";
    pub const UNREGISTER_CAPABILITY: &str = "client/unregisterCapability";
}

// ============================================================================
// Server Notifications
// ============================================================================

/// `window/showMessage` / `window/logMessage` type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Error,
    Warning,
    Info,
    Log,
}

impl MessageType {
    pub fn from_code(code: Option<u64>) -> Self {
        match code {
            Some(1) => Self::Error,
            Some(2) => Self::Warning,
            Some(3) => Self::Info,
            _ => Self::Log,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageParams {
    #[serde(rename = "type", default)]
    pub kind: Option<u64>,
    #[serde(default)]
    pub message: String,
}

impl MessageParams {
    pub fn message_type(&self) -> MessageType {
        MessageType::from_code(self.kind)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    #[serde(default)]
    pub version: Option<i32>,
    #[serde(default)]
    pub diagnostics: Vec<crate::models::diagnostic::LspDiagnostic>,
}

/// Notifications the client understands; everything else is logged and dropped
#[derive(Debug, Clone)]
pub enum ServerNotification {
    PublishDiagnostics(PublishDiagnosticsParams),
    LogMessage(MessageParams),
    ShowMessage(MessageParams),
    Unknown(String),
}

impl ServerNotification {
    pub fn parse(notification: Notification) -> serde_json::Result<Self> {
        Ok(match notification.method.as_str() {
            methods::PUBLISH_DIAGNOSTICS => {
                Self::PublishDiagnostics(serde_json::from_value(notification.params)?)
            }
            methods::LOG_MESSAGE => Self::LogMessage(serde_json::from_value(notification.params)?),
            methods::SHOW_MESSAGE => {
                Self::ShowMessage(serde_json::from_value(notification.params)?)
            }
            _ => Self::Unknown(notification.method),
        })
    }
}

// ============================================================================
// LSP Initialize Types
// ============================================================================

/// Client info for identification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Initialize params
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub process_id: Option<u32>,
    pub root_uri: Option<String>,
    pub capabilities: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialization_options: Option<Value>,
}

/// What this client can consume; kept to the methods it actually sends
pub fn client_capabilities() -> Value {
    serde_json::json!({
        "general": {
            "positionEncodings": ["utf-16"]
        },
        "window": {
            "showMessage": {}
        },
        "workspace": {
            "configuration": true,
            "didChangeConfiguration": { "dynamicRegistration": false }
        },
        "textDocument": {
            "synchronization": {
                "dynamicRegistration": false,
                "willSave": false,
                "willSaveWaitUntil": false,
                "didSave": true
            },
            "hover": {
                "contentFormat": ["plaintext", "markdown"]
            },
            "completion": {
                "completionItem": { "snippetSupport": false }
            },
            "formatting": {},
            "rangeFormatting": {},
            "definition": { "linkSupport": false },
            "declaration": { "linkSupport": false },
            "typeDefinition": { "linkSupport": false },
            "implementation": { "linkSupport": false },
            "references": {},
            "documentSymbol": { "hierarchicalDocumentSymbolSupport": true },
            "publishDiagnostics": { "versionSupport": true }
        }
    })
}

/// Server info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl std::fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

// ============================================================================
// LSP Result Types
// ============================================================================

/// Location in a document (LSP wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspLocation {
    pub uri: String,
    pub range: Range,
}

/// Document symbol (hierarchical form, ranges relative to the requested document)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: u64,
    pub range: Range,
    #[serde(default)]
    pub selection_range: Option<Range>,
    #[serde(default)]
    pub children: Vec<DocumentSymbol>,
}

/// Symbol information (flat form, carries its own location)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInformation {
    pub name: String,
    pub kind: u64,
    pub location: LspLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_always_carries_params() {
        let json = serde_json::to_value(Request::new(7, "shutdown", None)).unwrap();
        assert_eq!(json["params"], serde_json::json!({}));
        assert_eq!(json["id"], 7);

        let json = serde_json::to_value(Notification::new("exit", Some(Value::Null))).unwrap();
        assert_eq!(json["params"], serde_json::json!({}));
    }

    #[test]
    fn test_message_classification() {
        let response = Message::from_value(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": null
        }))
        .unwrap();
        assert!(matches!(response, Message::Response(_)));

        let request = Message::from_value(serde_json::json!({
            "jsonrpc": "2.0", "id": "a", "method": "workspace/configuration"
        }))
        .unwrap();
        match request {
            Message::Request(req) => assert_eq!(req.params, Value::Null),
            other => panic!("unexpected {other:?}"),
        }

        let notification = Message::from_value(serde_json::json!({
            "jsonrpc": "2.0", "method": "window/logMessage", "params": {"type": 3, "message": "hi"}
        }))
        .unwrap();
        assert!(matches!(notification, Message::Notification(_)));

        assert!(Message::from_value(serde_json::json!({"jsonrpc": "2.0"})).is_err());
    }

    #[test]
    fn test_request_id_as_number() {
        assert_eq!(RequestId::Number(4).as_number(), Some(4));
        assert_eq!(RequestId::String("12".into()).as_number(), Some(12));
        assert_eq!(RequestId::String("abc".into()).as_number(), None);
    }

    #[test]
    fn test_server_notification_dispatch() {
        let parsed = ServerNotification::parse(Notification::new(
            methods::SHOW_MESSAGE,
            Some(serde_json::json!({"type": 1, "message": "bad"})),
        ))
        .unwrap();
        match parsed {
            ServerNotification::ShowMessage(params) => {
                assert_eq!(params.message_type(), MessageType::Error);
                assert_eq!(params.message, "bad");
            }
            other => panic!("unexpected {other:?}"),
        }

        let parsed = ServerNotification::parse(Notification::new("$/progress", None)).unwrap();
        assert!(matches!(parsed, ServerNotification::Unknown(m) if m == "$/progress"));
    }

    #[test]
    fn test_server_info_display() {
        let info = ServerInfo {
            name: "gopls".into(),
            version: Some("v0.16".into()),
        };
        assert_eq!(info.to_string(), "gopls v0.16");
    }
}

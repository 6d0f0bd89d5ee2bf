//! Negotiated Server Capabilities
//!
//! Records what each connection's server advertised in its initialize
//! response, so a user action can be refused before anything is sent.

use std::collections::HashMap;

use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::protocol::Method;

/// Features a user action can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// textDocument/hover
    Hover,
    /// textDocument/formatting
    Formatting,
    /// textDocument/rangeFormatting
    RangeFormatting,
    /// textDocument/completion
    Completion,
    /// textDocument/definition
    Definition,
    /// textDocument/declaration
    Declaration,
    /// textDocument/typeDefinition
    TypeDefinition,
    /// textDocument/implementation
    Implementation,
    /// textDocument/references
    References,
    /// textDocument/documentSymbol
    DocumentSymbol,
}

impl Capability {
    /// Key under `capabilities` in the initialize result
    pub fn provider_key(&self) -> &'static str {
        match self {
            Self::Hover => "hoverProvider",
            Self::Formatting => "documentFormattingProvider",
            Self::RangeFormatting => "documentRangeFormattingProvider",
            Self::Completion => "completionProvider",
            Self::Definition => "definitionProvider",
            Self::Declaration => "declarationProvider",
            Self::TypeDefinition => "typeDefinitionProvider",
            Self::Implementation => "implementationProvider",
            Self::References => "referencesProvider",
            Self::DocumentSymbol => "documentSymbolProvider",
        }
    }

    /// Get human-readable name for the feature
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Hover => "hover",
            Self::Formatting => "formatting",
            Self::RangeFormatting => "range formatting",
            Self::Completion => "completion",
            Self::Definition => "go to definition",
            Self::Declaration => "go to declaration",
            Self::TypeDefinition => "go to type definition",
            Self::Implementation => "find implementations",
            Self::References => "find references",
            Self::DocumentSymbol => "document symbols",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Hover => Method::Hover,
            Self::Formatting => Method::Formatting,
            Self::RangeFormatting => Method::RangeFormatting,
            Self::Completion => Method::Completion,
            Self::Definition => Method::Definition,
            Self::Declaration => Method::Declaration,
            Self::TypeDefinition => Method::TypeDefinition,
            Self::Implementation => Method::Implementation,
            Self::References => Method::References,
            Self::DocumentSymbol => Method::DocumentSymbol,
        }
    }
}

/// How the server wants document changes delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum TextDocumentSyncKind {
    None = 0,
    Full = 1,
    Incremental = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSync {
    pub change: TextDocumentSyncKind,
    /// didSave should carry the full text
    pub include_text: bool,
}

impl Default for TextSync {
    fn default() -> Self {
        // Unspecified: forward edits as the host supplies them
        Self {
            change: TextDocumentSyncKind::Incremental,
            include_text: false,
        }
    }
}

impl TextSync {
    fn from_raw(raw: Option<&Value>) -> Self {
        let mut sync = Self::default();
        match raw {
            Some(Value::Number(_)) => {
                if let Some(kind) = raw.and_then(parse_sync_kind) {
                    sync.change = kind;
                }
            }
            Some(Value::Object(options)) => {
                if let Some(kind) = options.get("change").and_then(parse_sync_kind) {
                    sync.change = kind;
                }
                sync.include_text = options
                    .get("save")
                    .and_then(|save| save.get("includeText"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
            }
            _ => {}
        }
        sync
    }
}

fn parse_sync_kind(value: &Value) -> Option<TextDocumentSyncKind> {
    serde_json::from_value(value.clone()).ok()
}

fn capability_present(raw: &Value, key: &str) -> bool {
    match raw.get(key) {
        Some(Value::Bool(enabled)) => *enabled,
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Capabilities of one server, as advertised
#[derive(Debug, Clone, Default)]
pub struct ServerCapabilities {
    raw: Value,
    sync: TextSync,
}

impl ServerCapabilities {
    pub fn from_raw(raw: Value) -> Self {
        let sync = TextSync::from_raw(raw.get("textDocumentSync"));
        Self { raw, sync }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        capability_present(&self.raw, capability.provider_key())
    }

    pub fn sync(&self) -> TextSync {
        self.sync
    }
}

/// Capabilities of every active connection, keyed by identity
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    servers: HashMap<String, ServerCapabilities>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identity: impl Into<String>, capabilities: ServerCapabilities) {
        self.servers.insert(identity.into(), capabilities);
    }

    pub fn supports(&self, identity: &str, capability: Capability) -> bool {
        self.servers
            .get(identity)
            .is_some_and(|caps| caps.supports(capability))
    }

    pub fn sync(&self, identity: &str) -> TextSync {
        self.servers
            .get(identity)
            .map(ServerCapabilities::sync)
            .unwrap_or_default()
    }

    pub fn remove(&mut self, identity: &str) -> Option<ServerCapabilities> {
        self.servers.remove(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(json: Value) -> ServerCapabilities {
        ServerCapabilities::from_raw(json)
    }

    #[test]
    fn test_capability_presence() {
        let caps = caps(serde_json::json!({
            "hoverProvider": true,
            "definitionProvider": false,
            "completionProvider": {"triggerCharacters": ["."]},
            "referencesProvider": null
        }));
        assert!(caps.supports(Capability::Hover));
        assert!(!caps.supports(Capability::Definition));
        assert!(caps.supports(Capability::Completion));
        assert!(!caps.supports(Capability::References));
        assert!(!caps.supports(Capability::Formatting));
    }

    #[test]
    fn test_sync_kind_forms() {
        assert_eq!(
            caps(serde_json::json!({"textDocumentSync": 1})).sync().change,
            TextDocumentSyncKind::Full
        );

        let sync = caps(serde_json::json!({
            "textDocumentSync": {"openClose": true, "change": 0, "save": {"includeText": true}}
        }))
        .sync();
        assert_eq!(sync.change, TextDocumentSyncKind::None);
        assert!(sync.include_text);

        let sync = caps(serde_json::json!({"textDocumentSync": {"save": true}})).sync();
        assert_eq!(sync.change, TextDocumentSyncKind::Incremental);
        assert!(!sync.include_text);

        // Unknown kinds keep the default
        assert_eq!(
            caps(serde_json::json!({"textDocumentSync": 7})).sync().change,
            TextDocumentSyncKind::Incremental
        );
    }

    #[test]
    fn test_registry() {
        let mut registry = CapabilityRegistry::new();
        assert!(!registry.supports("clangd", Capability::Hover));

        registry.register(
            "clangd",
            caps(serde_json::json!({"hoverProvider": true, "textDocumentSync": 1})),
        );
        registry.register("pyright", caps(serde_json::json!({"referencesProvider": true})));

        assert!(registry.supports("clangd", Capability::Hover));
        assert!(!registry.supports("pyright", Capability::Hover));
        assert!(registry.supports("pyright", Capability::References));
        assert_eq!(registry.sync("clangd").change, TextDocumentSyncKind::Full);

        assert!(registry.remove("clangd").is_some());
        assert!(!registry.supports("clangd", Capability::Hover));
        // Unknown connections fall back to the default sync
        assert_eq!(registry.sync("clangd"), TextSync::default());
    }

    #[test]
    fn test_capability_methods() {
        assert_eq!(Capability::TypeDefinition.method(), Method::TypeDefinition);
        assert_eq!(
            Capability::Formatting.provider_key(),
            "documentFormattingProvider"
        );
    }
}

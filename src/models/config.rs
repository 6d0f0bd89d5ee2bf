//! Configuration model for lspc

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// lspc configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LspcConfig {
    #[serde(default)]
    pub lsp: LspSettings,

    /// User-defined servers; these take precedence over the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerConfig>,
}

/// Session-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspSettings {
    /// How long the CLI waits for a server to answer
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long the CLI waits for a first diagnostics publication
    #[serde(default = "defaults::diagnostics_wait_secs")]
    pub diagnostics_wait_secs: u64,

    /// Grace period between `exit` and killing the process
    #[serde(default = "defaults::shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Captured stderr per server, in bytes
    #[serde(default = "defaults::stderr_log_limit")]
    pub stderr_log_limit: usize,

    #[serde(default = "defaults::tab_size")]
    pub tab_size: u32,

    #[serde(default = "defaults::insert_spaces")]
    pub insert_spaces: bool,
}

impl Default for LspSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: defaults::request_timeout_secs(),
            diagnostics_wait_secs: defaults::diagnostics_wait_secs(),
            shutdown_grace_ms: defaults::shutdown_grace_ms(),
            stderr_log_limit: defaults::stderr_log_limit(),
            tab_size: defaults::tab_size(),
            insert_spaces: defaults::insert_spaces(),
        }
    }
}

mod defaults {
    pub fn request_timeout_secs() -> u64 {
        30
    }
    pub fn diagnostics_wait_secs() -> u64 {
        5
    }
    pub fn shutdown_grace_ms() -> u64 {
        2000
    }
    pub fn stderr_log_limit() -> usize {
        256 * 1024
    }
    pub fn tab_size() -> u32 {
        4
    }
    pub fn insert_spaces() -> bool {
        true
    }
}

/// How to launch one language server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Short name; also the connection identity when set
    #[serde(default)]
    pub name: String,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Language ids this server handles; empty means every document
    #[serde(default)]
    pub file_types: Vec<String>,

    /// Server emits completions that need prefix filtering and de-duplication
    #[serde(default)]
    pub completion_quirks: bool,

    /// Pushed once via workspace/didChangeConfiguration after initialize,
    /// and used to answer workspace/configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialization_options: Option<Value>,
}

impl ServerConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: String::new(),
            command: command.into(),
            args,
            file_types: Vec::new(),
            completion_quirks: false,
            settings: None,
            initialization_options: None,
        }
    }

    /// Connection identity: the short name, else the program path
    pub fn identity(&self) -> &str {
        if self.name.is_empty() {
            &self.command
        } else {
            &self.name
        }
    }

    pub fn handles(&self, language_id: &str) -> bool {
        self.file_types.is_empty() || self.file_types.iter().any(|ft| ft == language_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LspcConfig::default();
        assert_eq!(config.lsp.request_timeout_secs, 30);
        assert_eq!(config.lsp.shutdown_grace_ms, 2000);
        assert_eq!(config.lsp.tab_size, 4);
        assert!(config.lsp.insert_spaces);
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_parse_servers_from_toml() {
        let config: LspcConfig = toml::from_str(
            r#"
            [lsp]
            request_timeout_secs = 10

            [[servers]]
            name = "ra"
            command = "rust-analyzer"
            file_types = ["rust"]
            completion_quirks = true

            [servers.settings.rust-analyzer]
            checkOnSave = false
            "#,
        )
        .unwrap();

        assert_eq!(config.lsp.request_timeout_secs, 10);
        assert_eq!(config.lsp.tab_size, 4);
        let server = &config.servers[0];
        assert_eq!(server.identity(), "ra");
        assert!(server.completion_quirks);
        assert_eq!(
            server.settings.as_ref().unwrap()["rust-analyzer"]["checkOnSave"],
            false
        );
    }

    #[test]
    fn test_identity_falls_back_to_command() {
        let server = ServerConfig::new("/usr/bin/clangd", vec![]);
        assert_eq!(server.identity(), "/usr/bin/clangd");
        assert!(server.handles("cpp"));
    }

    #[test]
    fn test_handles_file_types() {
        let mut server = ServerConfig::new("gopls", vec![]);
        server.file_types = vec!["go".to_string()];
        assert!(server.handles("go"));
        assert!(!server.handles("rust"));
    }
}

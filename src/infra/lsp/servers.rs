//! Language Server Configurations
//!
//! Built-in launch settings, file-type detection, and lookup that lets
//! user-configured servers override the defaults.

use std::path::Path;
use std::process::Command;

use crate::models::config::ServerConfig;

/// Protocol language id for a file, from its extension
pub fn language_id_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let id = match ext.as_str() {
        // Systems
        "rs" => "rust",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" => "cpp",
        "zig" => "zig",
        "go" => "go",

        // Web
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",

        // Scripting
        "py" | "pyi" => "python",
        "lua" => "lua",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" => "shellscript",

        _ => return None,
    };
    Some(id)
}

fn server(name: &str, command: &str, args: &[&str], file_types: &[&str]) -> ServerConfig {
    ServerConfig {
        name: name.to_string(),
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        file_types: file_types.iter().map(|f| f.to_string()).collect(),
        completion_quirks: false,
        settings: None,
        initialization_options: None,
    }
}

/// Built-in server configurations
pub fn defaults() -> Vec<ServerConfig> {
    vec![
        server("rust-analyzer", "rust-analyzer", &[], &["rust"]),
        server("clangd", "clangd", &["--background-index"], &["c", "cpp"]),
        server("gopls", "gopls", &[], &["go"]),
        server("zls", "zls", &[], &["zig"]),
        server(
            "pyright",
            "pyright-langserver",
            &["--stdio"],
            &["python"],
        ),
        server(
            "typescript-language-server",
            "typescript-language-server",
            &["--stdio"],
            &[
                "typescript",
                "typescriptreact",
                "javascript",
                "javascriptreact",
            ],
        ),
        server("lua-language-server", "lua-language-server", &[], &["lua"]),
    ]
}

/// Configured servers in precedence order
#[derive(Debug, Clone)]
pub struct ServerCatalog {
    servers: Vec<ServerConfig>,
}

impl ServerCatalog {
    /// User entries first, then every default whose identity they do not shadow
    pub fn new(configured: Vec<ServerConfig>) -> Self {
        let mut servers = configured;
        for default in defaults() {
            if !servers.iter().any(|s| s.identity() == default.identity()) {
                servers.push(default);
            }
        }
        Self { servers }
    }

    pub fn servers(&self) -> &[ServerConfig] {
        &self.servers
    }

    /// First server whose file types include the language id
    pub fn for_language(&self, language_id: &str) -> Option<&ServerConfig> {
        self.servers
            .iter()
            .find(|s| !s.file_types.is_empty() && s.handles(language_id))
    }

    /// Look up by identity or program
    pub fn find(&self, key: &str) -> Option<&ServerConfig> {
        self.servers
            .iter()
            .find(|s| s.identity() == key)
            .or_else(|| self.servers.iter().find(|s| s.command == key))
    }

    /// Settings for an explicit program launch; known programs keep their
    /// configured file types and settings
    pub fn for_command(&self, name: Option<&str>, command: &str, args: Vec<String>) -> ServerConfig {
        let mut config = self
            .find(command)
            .cloned()
            .unwrap_or_else(|| ServerConfig::new(command, Vec::new()));
        config.command = command.to_string();
        config.args = args;
        if let Some(name) = name {
            config.name = name.to_string();
        }
        config
    }
}

/// Whether the server's program can be found on this machine
pub fn is_installed(config: &ServerConfig) -> bool {
    let program = Path::new(&config.command);
    if program.components().count() > 1 {
        return program.is_file();
    }

    #[cfg(unix)]
    let lookup = "which";
    #[cfg(windows)]
    let lookup = "where";

    Command::new(lookup)
        .arg(&config.command)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_language_detection() {
        assert_eq!(language_id_for_path(Path::new("src/main.rs")), Some("rust"));
        assert_eq!(language_id_for_path(Path::new("a/B.TSX")), Some("typescriptreact"));
        assert_eq!(language_id_for_path(Path::new("x.h")), Some("c"));
        assert_eq!(language_id_for_path(Path::new("Makefile")), None);
        assert_eq!(language_id_for_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_defaults_have_unique_identities() {
        let servers = defaults();
        let mut identities: Vec<&str> = servers.iter().map(|s| s.identity()).collect();
        identities.sort();
        identities.dedup();
        assert_eq!(identities.len(), servers.len());
    }

    #[test]
    fn test_catalog_prefers_configured() {
        let mut custom = ServerConfig::new("ra-nightly", vec![]);
        custom.name = "rust-analyzer".to_string();
        custom.file_types = vec!["rust".to_string()];

        let catalog = ServerCatalog::new(vec![custom]);
        assert_eq!(catalog.for_language("rust").unwrap().command, "ra-nightly");
        assert_eq!(
            catalog
                .servers()
                .iter()
                .filter(|s| s.identity() == "rust-analyzer")
                .count(),
            1
        );
        assert_eq!(catalog.for_language("go").unwrap().identity(), "gopls");
        assert!(catalog.for_language("cobol").is_none());
    }

    #[test]
    fn test_find_by_identity_or_command() {
        let catalog = ServerCatalog::new(vec![]);
        assert_eq!(catalog.find("pyright").unwrap().command, "pyright-langserver");
        assert_eq!(catalog.find("pyright-langserver").unwrap().identity(), "pyright");
        assert!(catalog.find("nothing").is_none());
    }

    #[test]
    fn test_for_command_keeps_known_settings() {
        let catalog = ServerCatalog::new(vec![]);
        let config = catalog.for_command(None, "gopls", vec!["serve".into()]);
        assert_eq!(config.identity(), "gopls");
        assert_eq!(config.file_types, vec!["go".to_string()]);
        assert_eq!(config.args, vec!["serve".to_string()]);

        let config = catalog.for_command(Some("mine"), "/opt/bin/custom-ls", vec![]);
        assert_eq!(config.identity(), "mine");
        assert!(config.file_types.is_empty());
    }

    #[test]
    fn test_is_installed_with_missing_path() {
        let config = ServerConfig::new(
            PathBuf::from("/definitely/not/here/ls")
                .to_string_lossy()
                .into_owned(),
            vec![],
        );
        assert!(!is_installed(&config));
    }
}

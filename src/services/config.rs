//! Configuration service for lspc
//!
//! Global file at `$XDG_CONFIG_HOME/lspc/config.toml`, project file at
//! `.lspc/config.toml`. Project `[lsp]` keys win key by key; project
//! servers come before global ones of the same identity.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::models::config::LspcConfig;

pub const REQUEST_TIMEOUT_ENV: &str = "LSPC_REQUEST_TIMEOUT";

#[async_trait]
pub trait ConfigService: Send + Sync {
    async fn load(&self, global_only: bool) -> Result<LspcConfig, ConfigError>;
    fn config_path(&self, global: bool) -> PathBuf;
    async fn init(&self, global: bool, force: bool) -> Result<PathBuf, ConfigError>;
}

pub struct DefaultConfigService {
    root: PathBuf,
    global_path: PathBuf,
}

impl DefaultConfigService {
    pub fn new(root: &Path) -> Self {
        Self::with_global_path(root, Self::global_config_path())
    }

    pub fn with_global_path(root: &Path, global_path: PathBuf) -> Self {
        Self {
            root: root.to_path_buf(),
            global_path,
        }
    }

    fn global_config_path() -> PathBuf {
        // XDG standard: ~/.config/lspc/config.toml
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lspc")
            .join("config.toml")
    }

    fn project_config_path(&self) -> PathBuf {
        self.root.join(".lspc").join("config.toml")
    }

    async fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
        if !path.exists() {
            return Ok(toml::Table::new());
        }
        let content = tokio::fs::read_to_string(path).await?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    async fn write_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let config = LspcConfig::default();
        let content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Parse(e.to_string()))?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigService for DefaultConfigService {
    async fn load(&self, global_only: bool) -> Result<LspcConfig, ConfigError> {
        let global = Self::read_table(&self.global_path).await?;
        let merged = if global_only {
            global
        } else {
            let project = Self::read_table(&self.project_config_path()).await?;
            merge_tables(global, project)
        };

        let config: LspcConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        apply_env_overrides(config, std::env::var(REQUEST_TIMEOUT_ENV).ok())
    }

    fn config_path(&self, global: bool) -> PathBuf {
        if global {
            self.global_path.clone()
        } else {
            self.project_config_path()
        }
    }

    async fn init(&self, global: bool, force: bool) -> Result<PathBuf, ConfigError> {
        let path = self.config_path(global);

        if path.exists() && !force {
            return Err(ConfigError::InvalidValue {
                key: "config".to_string(),
                message: format!(
                    "Config already exists: {}. Use --force to overwrite.",
                    path.display()
                ),
            });
        }

        Self::write_default_config(&path).await?;
        Ok(path)
    }
}

fn merge_tables(mut base: toml::Table, mut overlay: toml::Table) -> toml::Table {
    if let Some(toml::Value::Table(lsp)) = overlay.remove("lsp") {
        match base.get_mut("lsp") {
            Some(toml::Value::Table(existing)) => existing.extend(lsp),
            _ => {
                base.insert("lsp".to_string(), toml::Value::Table(lsp));
            }
        }
    }

    if let Some(toml::Value::Array(mut servers)) = overlay.remove("servers") {
        if let Some(toml::Value::Array(global)) = base.remove("servers") {
            servers.extend(global);
        }
        base.insert("servers".to_string(), toml::Value::Array(servers));
    }

    base.extend(overlay);
    base
}

fn apply_env_overrides(
    mut config: LspcConfig,
    request_timeout: Option<String>,
) -> Result<LspcConfig, ConfigError> {
    if let Some(val) = request_timeout {
        config.lsp.request_timeout_secs =
            val.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: REQUEST_TIMEOUT_ENV.to_string(),
                    message: format!("expected whole seconds, got '{val}'"),
                })?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn service(dir: &TempDir) -> DefaultConfigService {
        DefaultConfigService::with_global_path(dir.path(), dir.path().join("global/config.toml"))
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let dir = TempDir::new().unwrap();
        let config = tokio_test::block_on(service(&dir).load(false)).unwrap();
        assert_eq!(config.lsp.tab_size, 4);
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_project_overrides_global_per_key() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        write(
            &service.config_path(true),
            r#"
[lsp]
tab_size = 8
shutdown_grace_ms = 100

[[servers]]
name = "py"
command = "pylsp"
file_types = ["python"]
"#,
        );
        write(
            &service.config_path(false),
            r#"
[lsp]
tab_size = 2

[[servers]]
command = "clangd"
args = ["--background-index"]
file_types = ["c", "cpp"]
"#,
        );

        let config = tokio_test::block_on(service.load(false)).unwrap();
        assert_eq!(config.lsp.tab_size, 2);
        assert_eq!(config.lsp.shutdown_grace_ms, 100);
        let commands: Vec<&str> = config.servers.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["clangd", "pylsp"]);

        let global = tokio_test::block_on(service.load(true)).unwrap();
        assert_eq!(global.lsp.tab_size, 8);
        assert_eq!(global.servers.len(), 1);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        write(&service.config_path(false), "[lsp\n");

        let err = tokio_test::block_on(service.load(false)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref msg) if msg.contains(".lspc")));
    }

    #[test]
    fn test_timeout_override() {
        let config = apply_env_overrides(LspcConfig::default(), Some("5".into())).unwrap();
        assert_eq!(config.lsp.request_timeout_secs, 5);

        let err = apply_env_overrides(LspcConfig::default(), Some("soon".into())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let path = tokio_test::block_on(service.init(false, false)).unwrap();
        assert!(path.ends_with(".lspc/config.toml"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("request_timeout_secs"));

        assert!(tokio_test::block_on(service.init(false, false)).is_err());
        assert!(tokio_test::block_on(service.init(false, true)).is_ok());
    }
}

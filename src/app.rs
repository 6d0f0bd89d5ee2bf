//! Application container for lspc

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::OutputContext;
use crate::infra::lsp::ServerCatalog;
use crate::models::config::LspcConfig;
use crate::services::config::{ConfigService, DefaultConfigService};

pub struct App {
    root: PathBuf,
    pub(crate) output: OutputContext,
    pub(crate) config_service: Arc<dyn ConfigService>,
    pub(crate) config: LspcConfig,
    pub(crate) catalog: ServerCatalog,
    /// `--server`: name or program overriding the file-type lookup
    pub(crate) server: Option<String>,
    /// `--show-log`: attach the server's captured stderr to the output
    pub(crate) show_log: bool,
}

impl App {
    pub async fn new(server: Option<String>, show_log: bool) -> anyhow::Result<Self> {
        let root = std::env::current_dir()?;

        tracing::debug!("Initializing lspc at {:?}", root);

        let output = OutputContext::new(root.clone());
        let config_service = Arc::new(DefaultConfigService::new(&root));
        let config = config_service.load(false).await?;
        let catalog = ServerCatalog::new(config.servers.clone());

        tracing::info!("lspc initialized ({} servers known)", catalog.servers().len());

        Ok(Self {
            root,
            output,
            config_service,
            config,
            catalog,
            server,
            show_log,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LspcConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ServerCatalog {
        &self.catalog
    }
}

//! Shared state for network commands

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storefront_api_client::{
    ClientConfig, FileSessionStore, MemorySessionStore, Orchestrator, SessionStore,
    StorefrontClient,
};
use storefront_cli::output::print_json;
use storefront_cli::OutputFormat;
use tracing::{debug, warn};

/// Client, orchestrator and output settings for one invocation
pub struct Context {
    pub client: StorefrontClient,
    pub orchestrator: Orchestrator,
    pub format: OutputFormat,
}

impl Context {
    /// Load config, open the session store and build the client
    pub fn load(config: Option<&Path>, session_file: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let config = ClientConfig::load(config)?;
        debug!(
            base_url = %config.base_url,
            environment = ?config.environment,
            "Configuration loaded"
        );

        let client = StorefrontClient::with_config(config)?.with_session_store(session_store(session_file));
        let orchestrator = Orchestrator::for_client(&client);

        Ok(Self {
            client,
            orchestrator,
            format,
        })
    }

    /// Print `value` as JSON, or hand it to `text` for human output
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> Result<()> {
        match self.format {
            OutputFormat::Json => print_json(value)?,
            OutputFormat::Text => text(value),
        }
        Ok(())
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn session_store(path: Option<PathBuf>) -> Arc<dyn SessionStore> {
    if let Some(path) = path {
        return Arc::new(FileSessionStore::new(path));
    }
    match FileSessionStore::default_location() {
        Some(store) => {
            debug!(path = %store.path().display(), "Using session file");
            Arc::new(store)
        }
        None => {
            warn!("No data directory available; session will not persist");
            Arc::new(MemorySessionStore::new())
        }
    }
}

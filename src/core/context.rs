//! Shared collaborators of the engines

use crate::adapters::store::{EdiStore, RecordStore};
use crate::adapters::transport::TransportFactory;
use crate::config::{EdiConfig, ProcessingConfig, ServerConfig};
use crate::core::registry::SchemaRegistry;
use crate::domain::{EdiError, Result, ServerId};
use std::sync::Arc;
use tempfile::TempDir;

/// Everything an engine needs: resolved schemas, both stores, transports and settings
#[derive(Clone)]
pub struct EngineContext {
    pub registry: Arc<SchemaRegistry>,
    pub records: Arc<dyn RecordStore + Send + Sync>,
    pub edi: Arc<dyn EdiStore + Send + Sync>,
    pub transports: Arc<dyn TransportFactory>,
    pub servers: Arc<Vec<ServerConfig>>,
    pub processing: ProcessingConfig,
}

impl EngineContext {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        records: Arc<dyn RecordStore + Send + Sync>,
        edi: Arc<dyn EdiStore + Send + Sync>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            registry,
            records,
            edi,
            transports,
            servers: Arc::new(Vec::new()),
            processing: ProcessingConfig::default(),
        }
    }

    /// Builds the registry from `config` and wires every collaborator
    pub fn from_config(
        config: &EdiConfig,
        records: Arc<dyn RecordStore + Send + Sync>,
        edi: Arc<dyn EdiStore + Send + Sync>,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<Self> {
        let registry = SchemaRegistry::build(config, records.as_ref())?;
        Ok(Self::new(Arc::new(registry), records, edi, transports)
            .with_servers(config.servers.clone())
            .with_processing(config.processing.clone()))
    }

    pub fn with_servers(mut self, servers: Vec<ServerConfig>) -> Self {
        self.servers = Arc::new(servers);
        self
    }

    pub fn with_processing(mut self, processing: ProcessingConfig) -> Self {
        self.processing = processing;
        self
    }

    pub fn server(&self, id: &ServerId) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| &s.id == id)
    }

    /// Server configuration, or a configuration error naming the missing id
    pub fn require_server(&self, id: &ServerId) -> Result<&ServerConfig> {
        self.server(id)
            .ok_or_else(|| EdiError::Configuration(format!("Unknown server '{id}'")))
    }

    /// Creates a temporary directory private to one invocation
    ///
    /// The directory and its contents are removed when the returned guard drops.
    pub fn scratch_dir(&self) -> Result<TempDir> {
        let dir = match &self.processing.scratch_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                tempfile::Builder::new().prefix("ediflow-").tempdir_in(parent)?
            }
            None => tempfile::Builder::new().prefix("ediflow-").tempdir()?,
        };
        Ok(dir)
    }
}

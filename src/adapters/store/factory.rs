//! Store factory
//!
//! Builds the record and EDI stores described by the `[store]` configuration section.

use super::records::MemoryRecordStore;
use super::state::MemoryEdiStore;
use super::traits::{EdiStore, RecordStore};
use crate::config::StoreConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Create the business record store
///
/// With `records_path` set the store is loaded from (and committed to) that snapshot;
/// otherwise it starts empty and lives only for this process.
pub fn create_record_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore + Send + Sync>> {
    let store = match &config.records_path {
        Some(path) => {
            tracing::info!(path = %path, "Opening record store snapshot");
            MemoryRecordStore::open(path)?
        }
        None => {
            tracing::warn!("No store.records_path configured, records are not persisted");
            MemoryRecordStore::new()
        }
    };
    Ok(Arc::new(store) as Arc<dyn RecordStore + Send + Sync>)
}

/// Create the EDI bookkeeping store
pub fn create_edi_store(config: &StoreConfig) -> Result<Arc<dyn EdiStore + Send + Sync>> {
    let store = match &config.state_path {
        Some(path) => {
            tracing::info!(path = %path, "Opening EDI state snapshot");
            MemoryEdiStore::open(path)?
        }
        None => {
            tracing::warn!("No store.state_path configured, transactions are not persisted");
            MemoryEdiStore::new()
        }
    };
    Ok(Arc::new(store) as Arc<dyn EdiStore + Send + Sync>)
}

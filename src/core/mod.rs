//! Core business logic for Ediflow.
//!
//! This module contains the mapping engines and the transaction lifecycle built on top
//! of the store and transport adapters.
//!
//! # Modules
//!
//! - [`registry`] - resolved mapping schemas, translations and receipt routes
//! - [`xml`] / [`tree`] - XML codec and path operations on value trees
//! - [`export`] - record to XML exports and the periodic outgoing batch
//! - [`import`] - XML to record imports with upsert matching
//! - [`state`] - transaction state machine and operator log books
//! - [`process`] - processing, recompute, reset and cancel
//! - [`split`] - streaming splitter for oversized documents
//! - [`sync`] - remote directory and file synchronization
//!
//! # Transfer Workflow
//!
//! Outgoing:
//!
//! 1. **Export**: unprocessed records are rendered through their schema into XML
//! 2. **Store**: the XML is stored as an attachment on a draft transaction
//! 3. **Process**: the attachment is uploaded to the schema's export directory
//! 4. **Mark**: exported records get `x_is_processed = true`
//!
//! Incoming:
//!
//! 1. **Sync**: new files are downloaded (split first when configured)
//! 2. **Store**: each file becomes an attachment and a draft transaction
//! 3. **Process**: the document is decoded and upserted into records
//!
//! # Example
//!
//! ```rust,no_run
//! use ediflow::adapters::store::{MemoryEdiStore, MemoryRecordStore};
//! use ediflow::adapters::transport::DefaultTransportFactory;
//! use ediflow::config::load_config;
//! use ediflow::core::context::EngineContext;
//! use ediflow::core::export::export_edi_transactions;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ediflow.toml")?;
//! let ctx = EngineContext::from_config(
//!     &config,
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(MemoryEdiStore::new()),
//!     Arc::new(DefaultTransportFactory::new()),
//! )?;
//!
//! let summary = export_edi_transactions(&ctx)?;
//! println!("Exported: {}", summary.transactions_created);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod export;
pub mod import;
pub mod process;
pub mod registry;
pub mod split;
pub mod state;
pub mod sync;
pub mod tree;
pub mod xml;

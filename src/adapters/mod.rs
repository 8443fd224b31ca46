//! External system integrations for Ediflow.
//!
//! This module provides the seams between the engines and the outside world:
//!
//! - [`store`] - business record store and EDI bookkeeping store (trait-based)
//! - [`transport`] - file transfer sessions against remote servers
//! - [`http`] - inbound document receipt endpoint
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. Engines only see the traits:
//!
//! ```rust
//! use ediflow::adapters::store::{EdiStore, MemoryEdiStore, RecordStore, MemoryRecordStore};
//! use std::sync::Arc;
//!
//! let records: Arc<dyn RecordStore + Send + Sync> = Arc::new(MemoryRecordStore::new());
//! let edi: Arc<dyn EdiStore + Send + Sync> = Arc::new(MemoryEdiStore::new());
//! assert!(edi.transactions().unwrap().is_empty());
//! # let _ = records;
//! ```
//!
//! # Transports
//!
//! FTP and SFTP clients are plugged in through
//! [`TransportFactory`](transport::TransportFactory); the crate ships a filesystem-rooted
//! [`LocalTransport`](transport::LocalTransport).

pub mod http;
pub mod store;
pub mod transport;

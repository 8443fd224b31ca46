//! Transport collaborator traits
//!
//! Every protocol is driven through the same session contract; engines only branch on
//! which server a destination names.

use crate::config::{Protocol, ServerConfig};
use crate::domain::TransportError;
use async_trait::async_trait;
use std::sync::Arc;

/// Result type of transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// An open connection to a server
#[async_trait]
pub trait TransportSession: Send {
    /// Every directory below `path`, recursively, as absolute remote paths
    async fn list_directories(&mut self, path: &str) -> TransportResult<Vec<String>>;

    /// File names (not paths) directly inside `path`
    async fn list_files(&mut self, path: &str) -> TransportResult<Vec<String>>;

    async fn download(&mut self, remote_path: &str) -> TransportResult<Vec<u8>>;

    async fn upload(&mut self, data: &[u8], remote_path: &str) -> TransportResult<()>;

    /// Creates a directory (and missing parents); succeeds if it already exists
    async fn make_dir(&mut self, path: &str) -> TransportResult<()>;

    async fn disconnect(self: Box<Self>) -> TransportResult<()>;
}

/// Opens sessions for one protocol
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, server: &ServerConfig) -> TransportResult<Box<dyn TransportSession>>;
}

/// Resolves the transport implementation for a protocol
pub trait TransportFactory: Send + Sync {
    fn transport(&self, protocol: Protocol) -> TransportResult<Arc<dyn Transport>>;
}

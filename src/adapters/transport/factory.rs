//! Transport factory
//!
//! Maps a server's protocol to its transport. Only the local transport ships with the
//! crate; FTP and SFTP clients are registered by the embedding host.

use super::local::LocalTransport;
use super::traits::{Transport, TransportFactory, TransportResult};
use crate::config::Protocol;
use crate::domain::TransportError;
use std::collections::HashMap;
use std::sync::Arc;

/// Protocol to transport registry
#[derive(Clone)]
pub struct DefaultTransportFactory {
    transports: HashMap<Protocol, Arc<dyn Transport>>,
}

impl DefaultTransportFactory {
    /// Creates a factory with the local transport registered
    pub fn new() -> Self {
        let mut transports: HashMap<Protocol, Arc<dyn Transport>> = HashMap::new();
        transports.insert(Protocol::Local, Arc::new(LocalTransport::new()));
        Self { transports }
    }

    /// Registers (or replaces) the transport of a protocol
    pub fn register(mut self, protocol: Protocol, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(protocol, transport);
        self
    }
}

impl Default for DefaultTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn transport(&self, protocol: Protocol) -> TransportResult<Arc<dyn Transport>> {
        self.transports
            .get(&protocol)
            .cloned()
            .ok_or_else(|| TransportError::UnsupportedProtocol(protocol.to_string()))
    }
}

//! File transfer transports
//!
//! - [`traits`] - `Transport`, `TransportSession` and `TransportFactory`
//! - [`local`] - filesystem-rooted implementation
//! - [`factory`] - protocol registry

pub mod factory;
pub mod local;
pub mod traits;

pub use factory::DefaultTransportFactory;
pub use local::LocalTransport;
pub use traits::{Transport, TransportFactory, TransportResult, TransportSession};

//! Record and EDI persistence
//!
//! - [`traits`] - `RecordStore` and `EdiStore` seams
//! - [`records`] / [`state`] - in-memory implementations with JSON snapshots
//! - [`factory`] - builds stores from configuration

pub mod factory;
pub mod records;
mod snapshot;
pub mod state;
pub mod traits;

pub use factory::{create_edi_store, create_record_store};
pub use records::MemoryRecordStore;
pub use state::MemoryEdiStore;
pub use traits::{EdiStore, RecordStore};

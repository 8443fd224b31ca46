//! Transaction lifecycle and operator logs
//!
//! - [`machine`] - allowed state transitions
//! - [`logbook`] - per-attempt log sessions and the retention sweep

pub mod logbook;
pub mod machine;

pub use logbook::{purge_expired_logs, LogSession};
pub use machine::TransactionStateMachine;

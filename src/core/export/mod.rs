//! Outgoing exports
//!
//! - [`prepare`] - renders a record into a value tree through its schema
//! - [`engine`] - stores exports as attachments and draft transactions
//! - [`batch`] - periodic selection of unprocessed records
//! - [`summary`] - run summaries shared by the batch entry points

pub mod batch;
pub mod engine;
pub mod prepare;
pub mod summary;

pub use batch::{export_edi_transactions, selection_conditions};
pub use engine::{ExportEngine, RECOMPUTE_HINT};
pub use prepare::{batch_file_name, record_file_name, ValuePreparer};
pub use summary::{BatchError, BatchErrorType, BatchResult, ExportSummary};

//! Domain models and types for Ediflow.
//!
//! This module contains the types shared by every engine: identifiers, records and their
//! field metadata, resolved mapping schemas, transactions, attachments, audit logs and
//! remote directories.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`SchemaId`], [`ServerId`], [`RecordId`], [`TransactionId`])
//! - **Record metadata** ([`FieldKind`], [`FieldDescriptor`], [`ModelDescriptor`])
//! - **Mapping schemas** ([`SchemaTable`], [`SchemaLine`], [`TranslationEntry`])
//! - **Transfer tracking** ([`Transaction`], [`Attachment`], [`LogBook`], [`RemoteDirectory`])
//! - **Error types** ([`EdiError`], [`TransportError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are newtypes, so a transaction id cannot be passed where a record id
//! is expected:
//!
//! ```rust
//! use ediflow::domain::{RecordId, TransactionId};
//!
//! let record = RecordId::new(7);
//! let transaction = TransactionId::new(7);
//! assert_eq!(record.get(), transaction.get());
//! // let wrong: RecordId = transaction;  // Compile error!
//! ```

pub mod attachment;
pub mod directory;
pub mod errors;
pub mod field;
pub mod ids;
pub mod logbook;
pub mod query;
pub mod record;
pub mod result;
pub mod schema;
pub mod transaction;

// Re-export commonly used types for convenience
pub use attachment::{Attachment, NewAttachment};
pub use directory::{DirectorySettings, RemoteDirectory};
pub use errors::{EdiError, TransportError};
pub use field::{FieldDescriptor, FieldKind, ModelDescriptor, SelectionOption, PROCESSED_FIELD};
pub use ids::{AttachmentId, DirectoryId, LogBookId, RecordId, SchemaId, ServerId, TransactionId};
pub use logbook::{LogBook, LogLine};
pub use query::{Condition, Operator};
pub use record::{Record, Values};
pub use result::Result;
pub use schema::{ExportDestination, FileType, SchemaLine, SchemaTable, TranslationEntry};
pub use transaction::{
    Direction, NewTransaction, Reference, Transaction, TransactionBuilder, TransactionState,
};

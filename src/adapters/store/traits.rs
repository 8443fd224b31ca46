//! Persistence traits
//!
//! The engines talk to two stores: the host's business records ([`RecordStore`]) and
//! the EDI bookkeeping entities ([`EdiStore`]). Both are synchronous; a unit of work is
//! made durable by calling `commit`.

use crate::domain::attachment::{Attachment, NewAttachment};
use crate::domain::directory::{DirectorySettings, RemoteDirectory};
use crate::domain::field::ModelDescriptor;
use crate::domain::ids::{AttachmentId, DirectoryId, LogBookId, RecordId, ServerId, TransactionId};
use crate::domain::logbook::{LogBook, LogLine};
use crate::domain::query::Condition;
use crate::domain::record::{Record, Values};
use crate::domain::transaction::{NewTransaction, Transaction, TransactionState};
use crate::domain::Result;
use chrono::{DateTime, Utc};

/// Business record storage and query
pub trait RecordStore: Send + Sync {
    /// Field metadata of a model
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the model does not exist.
    fn model(&self, name: &str) -> Result<ModelDescriptor>;

    /// Ids of records matching every condition, in id order
    fn search(
        &self,
        model: &str,
        conditions: &[Condition],
        limit: Option<usize>,
    ) -> Result<Vec<RecordId>>;

    /// Reads one record; one2many fields are filled from their inverse field
    fn read(&self, model: &str, id: RecordId) -> Result<Option<Record>>;

    fn create(&self, model: &str, values: Values) -> Result<RecordId>;

    /// Updates the given fields of an existing record
    fn write(&self, model: &str, id: RecordId, values: Values) -> Result<()>;

    /// Adds the boolean processed flag to a model if it is missing
    fn ensure_processed_field(&self, model: &str) -> Result<()>;

    /// Makes every change so far durable
    fn commit(&self) -> Result<()>;
}

/// Storage for transactions, attachments, log books and discovered directories
pub trait EdiStore: Send + Sync {
    fn create_transaction(&self, new: NewTransaction) -> Result<Transaction>;

    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// Persists every field of the transaction
    fn save_transaction(&self, transaction: &Transaction) -> Result<()>;

    fn find_transaction_by_name(&self, name: &str) -> Result<Option<Transaction>>;

    fn transactions_in_state(&self, state: TransactionState) -> Result<Vec<Transaction>>;

    fn transactions(&self) -> Result<Vec<Transaction>>;

    /// Claims a transaction for `owner` until `until`
    ///
    /// Returns `false` when another owner holds an unexpired claim.
    fn try_claim(
        &self,
        id: TransactionId,
        owner: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Drops the claim if `owner` still holds it
    fn release_claim(&self, id: TransactionId, owner: &str) -> Result<()>;

    fn create_attachment(&self, new: NewAttachment) -> Result<Attachment>;

    fn save_attachment(&self, attachment: &Attachment) -> Result<()>;

    fn attachment(&self, id: AttachmentId) -> Result<Option<Attachment>>;

    /// Finds an attachment by name within a directory (or outside any directory)
    fn find_attachment(
        &self,
        name: &str,
        directory: Option<DirectoryId>,
    ) -> Result<Option<Attachment>>;

    /// Opens a new log book with the next sequence name
    fn create_log_book(&self, file_name: &str) -> Result<LogBook>;

    fn log_book(&self, id: LogBookId) -> Result<Option<LogBook>>;

    fn add_log_line(&self, id: LogBookId, line: LogLine) -> Result<()>;

    /// Deletes a log book with its lines
    fn delete_log_book(&self, id: LogBookId) -> Result<()>;

    fn log_books_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<LogBookId>>;

    fn directories(&self, server: &ServerId) -> Result<Vec<RemoteDirectory>>;

    fn directory(&self, id: DirectoryId) -> Result<Option<RemoteDirectory>>;

    fn create_directory(
        &self,
        server: &ServerId,
        path: &str,
        settings: DirectorySettings,
    ) -> Result<RemoteDirectory>;

    fn save_directory(&self, directory: &RemoteDirectory) -> Result<()>;

    fn delete_directory(&self, id: DirectoryId) -> Result<()>;

    fn commit(&self) -> Result<()>;
}

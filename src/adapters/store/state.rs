//! In-memory EDI bookkeeping store
//!
//! Transactions, attachments, log books, discovered directories and transaction claims
//! live behind one mutex. With a snapshot path, `commit` persists them as JSON.

use super::snapshot::{read_snapshot, write_snapshot};
use super::traits::EdiStore;
use crate::domain::attachment::{Attachment, NewAttachment};
use crate::domain::directory::{DirectorySettings, RemoteDirectory};
use crate::domain::ids::{AttachmentId, DirectoryId, LogBookId, ServerId, TransactionId};
use crate::domain::logbook::{sequence_name, LogBook, LogLine};
use crate::domain::transaction::{NewTransaction, Transaction, TransactionState};
use crate::domain::{EdiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claim {
    owner: String,
    until: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateData {
    #[serde(default)]
    transactions: BTreeMap<u64, Transaction>,
    #[serde(default)]
    attachments: BTreeMap<u64, Attachment>,
    #[serde(default)]
    log_books: BTreeMap<u64, LogBook>,
    #[serde(default)]
    directories: BTreeMap<u64, RemoteDirectory>,
    #[serde(default)]
    claims: BTreeMap<u64, Claim>,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    log_sequence: u64,
}

impl StateData {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// EDI store kept in memory with optional snapshot persistence
#[derive(Debug, Default)]
pub struct MemoryEdiStore {
    data: Mutex<StateData>,
    snapshot: Option<PathBuf>,
}

impl MemoryEdiStore {
    /// Creates an empty store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store backed by a snapshot file (created on first commit)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data: StateData = read_snapshot(&path)?;
        tracing::debug!(
            path = %path.display(),
            transactions = data.transactions.len(),
            "Opened EDI state snapshot"
        );
        Ok(Self {
            data: Mutex::new(data),
            snapshot: Some(path),
        })
    }

    /// Every log book currently stored
    pub fn log_books(&self) -> Result<Vec<LogBook>> {
        Ok(self.lock()?.log_books.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StateData>> {
        self.data
            .lock()
            .map_err(|_| EdiError::Store("EDI store lock poisoned".to_string()))
    }
}

impl EdiStore for MemoryEdiStore {
    fn create_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        let mut data = self.lock()?;
        let id = TransactionId::new(data.next_id());
        let transaction = new.into_transaction(id, Utc::now());
        data.transactions.insert(id.get(), transaction.clone());
        Ok(transaction)
    }

    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.lock()?.transactions.get(&id.get()).cloned())
    }

    fn save_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut data = self.lock()?;
        let slot = data
            .transactions
            .get_mut(&transaction.id.get())
            .ok_or_else(|| {
                EdiError::Store(format!("Transaction {} does not exist", transaction.id))
            })?;
        *slot = transaction.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    fn find_transaction_by_name(&self, name: &str) -> Result<Option<Transaction>> {
        Ok(self
            .lock()?
            .transactions
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    fn transactions_in_state(&self, state: TransactionState) -> Result<Vec<Transaction>> {
        Ok(self
            .lock()?
            .transactions
            .values()
            .filter(|t| t.state == state)
            .cloned()
            .collect())
    }

    fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock()?.transactions.values().cloned().collect())
    }

    fn try_claim(
        &self,
        id: TransactionId,
        owner: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut data = self.lock()?;
        if let Some(claim) = data.claims.get(&id.get()) {
            if claim.owner != owner && claim.until > now {
                return Ok(false);
            }
        }
        data.claims.insert(
            id.get(),
            Claim {
                owner: owner.to_string(),
                until,
            },
        );
        Ok(true)
    }

    fn release_claim(&self, id: TransactionId, owner: &str) -> Result<()> {
        let mut data = self.lock()?;
        if data
            .claims
            .get(&id.get())
            .is_some_and(|claim| claim.owner == owner)
        {
            data.claims.remove(&id.get());
        }
        Ok(())
    }

    fn create_attachment(&self, new: NewAttachment) -> Result<Attachment> {
        let mut data = self.lock()?;
        let id = AttachmentId::new(data.next_id());
        let attachment = new.into_attachment(id, Utc::now());
        data.attachments.insert(id.get(), attachment.clone());
        Ok(attachment)
    }

    fn save_attachment(&self, attachment: &Attachment) -> Result<()> {
        let mut data = self.lock()?;
        let slot = data.attachments.get_mut(&attachment.id.get()).ok_or_else(|| {
            EdiError::Store(format!("Attachment {} does not exist", attachment.id))
        })?;
        *slot = attachment.clone();
        Ok(())
    }

    fn attachment(&self, id: AttachmentId) -> Result<Option<Attachment>> {
        Ok(self.lock()?.attachments.get(&id.get()).cloned())
    }

    fn find_attachment(
        &self,
        name: &str,
        directory: Option<DirectoryId>,
    ) -> Result<Option<Attachment>> {
        Ok(self
            .lock()?
            .attachments
            .values()
            .find(|a| a.name == name && a.directory == directory)
            .cloned())
    }

    fn create_log_book(&self, file_name: &str) -> Result<LogBook> {
        let mut data = self.lock()?;
        let id = LogBookId::new(data.next_id());
        data.log_sequence += 1;
        let book = LogBook {
            id,
            name: sequence_name(data.log_sequence),
            file_name: file_name.to_string(),
            lines: Vec::new(),
            created_at: Utc::now(),
        };
        data.log_books.insert(id.get(), book.clone());
        Ok(book)
    }

    fn log_book(&self, id: LogBookId) -> Result<Option<LogBook>> {
        Ok(self.lock()?.log_books.get(&id.get()).cloned())
    }

    fn add_log_line(&self, id: LogBookId, line: LogLine) -> Result<()> {
        let mut data = self.lock()?;
        let book = data
            .log_books
            .get_mut(&id.get())
            .ok_or_else(|| EdiError::Store(format!("Log book {id} does not exist")))?;
        book.lines.push(line);
        Ok(())
    }

    fn delete_log_book(&self, id: LogBookId) -> Result<()> {
        let mut data = self.lock()?;
        data.log_books.remove(&id.get());
        for tx in data.transactions.values_mut() {
            if tx.log == Some(id) {
                tx.log = None;
            }
        }
        Ok(())
    }

    fn log_books_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<LogBookId>> {
        Ok(self
            .lock()?
            .log_books
            .values()
            .filter(|b| b.created_at < cutoff)
            .map(|b| b.id)
            .collect())
    }

    fn directories(&self, server: &ServerId) -> Result<Vec<RemoteDirectory>> {
        Ok(self
            .lock()?
            .directories
            .values()
            .filter(|d| &d.server == server)
            .cloned()
            .collect())
    }

    fn directory(&self, id: DirectoryId) -> Result<Option<RemoteDirectory>> {
        Ok(self.lock()?.directories.get(&id.get()).cloned())
    }

    fn create_directory(
        &self,
        server: &ServerId,
        path: &str,
        settings: DirectorySettings,
    ) -> Result<RemoteDirectory> {
        let mut data = self.lock()?;
        let id = DirectoryId::new(data.next_id());
        let directory = RemoteDirectory {
            id,
            server: server.clone(),
            path: path.to_string(),
            settings,
        };
        data.directories.insert(id.get(), directory.clone());
        Ok(directory)
    }

    fn save_directory(&self, directory: &RemoteDirectory) -> Result<()> {
        let mut data = self.lock()?;
        let slot = data.directories.get_mut(&directory.id.get()).ok_or_else(|| {
            EdiError::Store(format!("Directory {} does not exist", directory.id))
        })?;
        *slot = directory.clone();
        Ok(())
    }

    fn delete_directory(&self, id: DirectoryId) -> Result<()> {
        self.lock()?.directories.remove(&id.get());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        if let Some(path) = &self.snapshot {
            let data = self.lock()?;
            write_snapshot(path, &*data)?;
        }
        Ok(())
    }
}

//! Operator log sessions and retention

use crate::adapters::store::EdiStore;
use crate::domain::ids::LogBookId;
use crate::domain::logbook::LogLine;
use crate::domain::Result;
use chrono::{DateTime, Duration, Utc};

/// Log book of one processing attempt
///
/// Opens (or reuses) a log book and appends lines to it. [`LogSession::finish`] deletes
/// the book again when nothing was written, so operators never see empty logs. A
/// session dropped without `finish`, e.g. on an early error return, prunes the same way.
pub struct LogSession<'a> {
    edi: &'a dyn EdiStore,
    id: LogBookId,
    name: String,
    faults: usize,
    finished: bool,
}

impl<'a> LogSession<'a> {
    /// Reuses `existing` if it still exists, otherwise opens a new book for `file_name`
    pub fn open(
        edi: &'a dyn EdiStore,
        existing: Option<LogBookId>,
        file_name: &str,
    ) -> Result<Self> {
        if let Some(id) = existing {
            if let Some(book) = edi.log_book(id)? {
                return Ok(Self {
                    edi,
                    id: book.id,
                    name: book.name,
                    faults: 0,
                    finished: false,
                });
            }
        }
        let book = edi.create_log_book(file_name)?;
        Ok(Self {
            edi,
            id: book.id,
            name: book.name,
            faults: 0,
            finished: false,
        })
    }

    pub fn id(&self) -> LogBookId {
        self.id
    }

    /// Sequence name shown to operators
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records a failed operation
    pub fn fault(&mut self, name: &str, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        tracing::warn!(log = %self.name, operation = name, message = %message, "Logged fault");
        self.faults += 1;
        self.push(LogLine::new(name, message, true))
    }

    /// Records an informational entry
    pub fn info(&mut self, name: &str, message: impl Into<String>) -> Result<()> {
        self.push(LogLine::new(name, message, false))
    }

    /// True when a fault was written during this session
    pub fn has_faults(&self) -> bool {
        self.faults > 0
    }

    /// Closes the session, deleting the book when it holds no lines
    ///
    /// Returns the book id when it was kept.
    pub fn finish(mut self) -> Result<Option<LogBookId>> {
        self.finished = true;
        self.prune()
    }

    fn prune(&self) -> Result<Option<LogBookId>> {
        let empty = self
            .edi
            .log_book(self.id)?
            .map_or(true, |book| book.lines.is_empty());
        if empty {
            self.edi.delete_log_book(self.id)?;
            return Ok(None);
        }
        Ok(Some(self.id))
    }

    fn push(&mut self, line: LogLine) -> Result<()> {
        self.edi.add_log_line(self.id, line)
    }
}

impl Drop for LogSession<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.prune() {
            Ok(None) => tracing::debug!(log = %self.name, "Unfinished empty log book removed"),
            Ok(Some(_)) => {}
            Err(e) => tracing::warn!(log = %self.name, error = %e, "Failed to prune log book"),
        }
    }
}

/// Deletes log books created more than `retention_days` before `now`
///
/// Returns the number of books removed.
pub fn purge_expired_logs(
    edi: &dyn EdiStore,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<usize> {
    let cutoff = now - Duration::days(retention_days);
    let expired = edi.log_books_older_than(cutoff)?;
    for id in &expired {
        edi.delete_log_book(*id)?;
    }
    edi.commit()?;
    tracing::info!(
        removed = expired.len(),
        retention_days,
        cutoff = %cutoff,
        "Expired log books purged"
    );
    Ok(expired.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryEdiStore;
    use crate::domain::EdiError;

    #[test]
    fn test_empty_session_is_deleted() {
        let edi = MemoryEdiStore::new();
        let session = LogSession::open(&edi, None, "a.xml").unwrap();
        let id = session.id();
        assert_eq!(session.finish().unwrap(), None);
        assert!(edi.log_book(id).unwrap().is_none());
    }

    #[test]
    fn test_session_with_lines_is_kept() {
        let edi = MemoryEdiStore::new();
        let mut session = LogSession::open(&edi, None, "a.xml").unwrap();
        session.fault("export", "Something went wrong").unwrap();
        assert!(session.has_faults());
        let id = session.finish().unwrap().unwrap();
        let book = edi.log_book(id).unwrap().unwrap();
        assert_eq!(book.lines.len(), 1);
        assert!(book.has_faults());
    }

    #[test]
    fn test_session_reuses_existing_book() {
        let edi = MemoryEdiStore::new();
        let mut first = LogSession::open(&edi, None, "a.xml").unwrap();
        first.info("sync", "downloaded").unwrap();
        let id = first.finish().unwrap().unwrap();

        let second = LogSession::open(&edi, Some(id), "a.xml").unwrap();
        assert_eq!(second.id(), id);
        // an untouched reused book keeps its earlier lines
        assert_eq!(second.finish().unwrap(), Some(id));
    }

    #[test]
    fn test_early_return_leaves_no_empty_book() {
        fn failing_step(edi: &MemoryEdiStore) -> Result<()> {
            let _log = LogSession::open(edi, None, "a.xml")?;
            Err(EdiError::Store("disk full".to_string()))
        }

        let edi = MemoryEdiStore::new();
        assert!(failing_step(&edi).is_err());
        assert!(edi.log_books().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_session_keeps_written_lines() {
        let edi = MemoryEdiStore::new();
        let id = {
            let mut session = LogSession::open(&edi, None, "a.xml").unwrap();
            session.fault("import", "Qty element not found").unwrap();
            session.id()
        };
        assert_eq!(edi.log_book(id).unwrap().unwrap().lines.len(), 1);
    }

    #[test]
    fn test_purge_expired_logs() {
        let edi = MemoryEdiStore::new();
        let mut session = LogSession::open(&edi, None, "old.xml").unwrap();
        session.info("x", "y").unwrap();
        session.finish().unwrap();

        let removed = purge_expired_logs(&edi, 13, Utc::now()).unwrap();
        assert_eq!(removed, 0);

        let removed = purge_expired_logs(&edi, 13, Utc::now() + Duration::days(14)).unwrap();
        assert_eq!(removed, 1);
        assert!(edi.log_books().unwrap().is_empty());
    }
}

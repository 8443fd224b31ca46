//! Batch summaries and reporting
//!
//! This module defines structures for tracking and reporting the results of the
//! periodic entry points (export batch, draft processing, file sync).

use crate::domain::EdiError;
use std::time::Duration;

/// Summary of one export batch run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Number of schemas visited
    pub schemas: usize,

    /// Number of records selected for export
    pub records_selected: usize,

    /// Transactions created in draft
    pub transactions_created: usize,

    /// Transactions created in failed state
    pub transactions_failed: usize,

    /// Duration of the run
    pub duration: Duration,

    /// Errors that aborted a whole schema
    pub errors: Vec<BatchError>,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new() -> Self {
        Self {
            schemas: 0,
            records_selected: 0,
            transactions_created: 0,
            transactions_failed: 0,
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: BatchError) {
        self.errors.push(error);
    }

    /// Check if the run had no failures
    pub fn is_successful(&self) -> bool {
        self.transactions_failed == 0 && self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            schemas = self.schemas,
            records_selected = self.records_selected,
            created = self.transactions_created,
            failed = self.transactions_failed,
            duration_ms = self.duration.as_millis() as u64,
            "Export batch completed"
        );
        log_errors("Export batch", &self.errors);
    }
}

impl Default for ExportSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome counts of a run over independent units (transactions, files)
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Units that completed
    pub successful: usize,
    /// Units that ended failed or partially done
    pub failed: usize,
    /// Units skipped (claimed elsewhere, already known, not processable)
    pub skipped: usize,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResult {
    /// Create a new empty batch result
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self) {
        self.successful += 1;
    }

    /// Add a failed unit with the reason
    pub fn add_failure(&mut self, error: BatchError) {
        self.failed += 1;
        self.errors.push(error);
    }

    pub fn add_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Merge another batch result into this one
    pub fn merge(&mut self, other: BatchResult) {
        self.successful += other.successful;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed + self.skipped
    }

    /// Check if no unit failed
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }

    /// Log the result under a batch label
    pub fn log_summary(&self, batch: &str) {
        tracing::info!(
            batch,
            successful = self.successful,
            failed = self.failed,
            skipped = self.skipped,
            "Batch completed"
        );
        log_errors(batch, &self.errors);
    }
}

/// Category of a batch error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchErrorType {
    Configuration,
    Validation,
    Transport,
    DataMapping,
    Xml,
    Store,
    State,
    Unknown,
}

impl From<&EdiError> for BatchErrorType {
    fn from(err: &EdiError) -> Self {
        match err {
            EdiError::Configuration(_) => BatchErrorType::Configuration,
            EdiError::Validation(_) | EdiError::Authentication(_) => BatchErrorType::Validation,
            EdiError::Transport(_) => BatchErrorType::Transport,
            EdiError::DataMapping(_) => BatchErrorType::DataMapping,
            EdiError::InvalidXml(_) | EdiError::Xml(_) => BatchErrorType::Xml,
            EdiError::Store(_) | EdiError::Io(_) | EdiError::Serialization(_) => {
                BatchErrorType::Store
            }
            EdiError::State(_) => BatchErrorType::State,
            EdiError::Other(_) => BatchErrorType::Unknown,
        }
    }
}

/// Batch error with context
#[derive(Debug, Clone)]
pub struct BatchError {
    /// Type of error
    pub error_type: BatchErrorType,

    /// Error message
    pub message: String,

    /// Optional context (schema, transaction or file name)
    pub context: Option<String>,
}

impl BatchError {
    pub fn new(error_type: BatchErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl From<&EdiError> for BatchError {
    fn from(err: &EdiError) -> Self {
        BatchError::new(BatchErrorType::from(err), err.to_string())
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{ctx}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

fn log_errors(batch: &str, errors: &[BatchError]) {
    if errors.is_empty() {
        return;
    }
    tracing::warn!(batch, error_count = errors.len(), "Batch completed with errors");
    for error in errors {
        tracing::warn!(
            error_type = ?error.error_type,
            context = error.context.as_deref().unwrap_or("-"),
            message = %error.message,
            "Batch error"
        );
    }
}

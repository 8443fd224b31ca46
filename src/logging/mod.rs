//! Logging and observability
//!
//! Process logs go through `tracing` with structured fields. Operator-facing audit
//! trails are the log books kept by the EDI store, see [`crate::core::state::LogSession`].
//!
//! # Example
//!
//! ```no_run
//! use ediflow::logging::init_logging;
//! use ediflow::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(schema = "partner_export", "Export started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a transaction state change
///
/// # Example
///
/// ```no_run
/// use ediflow::log_transaction_state;
/// use ediflow::domain::{TransactionId, TransactionState};
///
/// log_transaction_state!(TransactionId::new(4), TransactionState::Draft, TransactionState::Done);
/// ```
#[macro_export]
macro_rules! log_transaction_state {
    ($id:expr, $from:expr, $to:expr) => {
        tracing::info!(
            transaction_id = %$id,
            from = %$from,
            to = %$to,
            "Transaction state changed"
        );
    };
}

/// Log progress through a batch
///
/// # Example
///
/// ```no_run
/// use ediflow::log_batch_progress;
///
/// log_batch_progress!("auto_process", 10, 40);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($batch:expr, $current:expr, $total:expr) => {
        tracing::debug!(
            batch = $batch,
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / ($total as f64).max(1.0) * 100.0),
            "Processing batch"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use ediflow::log_error_with_context;
/// use ediflow::domain::EdiError;
///
/// let error = EdiError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

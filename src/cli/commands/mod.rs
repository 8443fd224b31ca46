//! CLI command implementations
//!
//! Every command loads the configuration, opens the stores and returns a process exit
//! code: 0 success, 1 partial failure, 2 configuration error, 4 connection error,
//! 5 fatal error.

pub mod export;
pub mod init;
pub mod operator;
pub mod process;
pub mod purge;
pub mod serve;
pub mod split;
pub mod status;
pub mod sync;
pub mod validate;

use crate::adapters::store::{create_edi_store, create_record_store};
use crate::adapters::transport::DefaultTransportFactory;
use crate::config::{load_config, EdiConfig};
use crate::core::context::EngineContext;
use crate::domain::{EdiError, TransportError};
use std::sync::Arc;

/// Exit code for an error that ended a command
pub(crate) fn exit_code(err: &EdiError) -> i32 {
    match err {
        EdiError::Configuration(_) | EdiError::Validation(_) => 2,
        EdiError::Transport(TransportError::ConnectionFailed { .. })
        | EdiError::Transport(TransportError::AuthenticationFailed(_)) => 4,
        _ => 5,
    }
}

/// Loads the configuration and wires an engine context
///
/// Failures are reported on stdout; the error side is the exit code to return.
pub(crate) fn open_context(config_path: &str) -> Result<(EdiConfig, EngineContext), i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Failed to load configuration file");
            println!("   Error: {e}");
            return Err(2);
        }
    };

    let stores = create_record_store(&config.store)
        .and_then(|records| Ok((records, create_edi_store(&config.store)?)));
    let (records, edi) = match stores {
        Ok(s) => s,
        Err(e) => {
            println!("❌ Failed to open stores");
            println!("   Error: {e}");
            return Err(5);
        }
    };

    match EngineContext::from_config(
        &config,
        records,
        edi,
        Arc::new(DefaultTransportFactory::new()),
    ) {
        Ok(ctx) => Ok((config, ctx)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build schema registry");
            println!("❌ Invalid mapping schemas");
            println!("   Error: {e}");
            Err(exit_code(&e))
        }
    }
}

/// Prints up to ten batch errors
pub(crate) fn print_errors(errors: &[crate::core::export::BatchError]) {
    if errors.is_empty() {
        return;
    }
    println!("⚠️  Errors encountered:");
    for error in errors.iter().take(10) {
        println!("  - {:?}: {}", error.error_type, error.message);
        if let Some(context) = &error.context {
            println!("    Context: {context}");
        }
    }
    if errors.len() > 10 {
        println!("  ... and {} more errors", errors.len() - 10);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&EdiError::Configuration("x".to_string())), 2);
        assert_eq!(
            exit_code(&EdiError::Transport(TransportError::ConnectionFailed {
                host: "h".to_string(),
                message: "refused".to_string(),
            })),
            4
        );
        assert_eq!(exit_code(&EdiError::Store("x".to_string())), 5);
    }

    #[test]
    fn test_open_context_missing_file() {
        assert_eq!(open_context("/nonexistent/ediflow.toml").err(), Some(2));
    }
}

//! Process command implementation
//!
//! Processes one transaction by id, or every draft transaction.

use super::{exit_code, open_context, print_errors};
use crate::core::process::{auto_process_edi_transactions, Processor};
use crate::domain::{TransactionId, TransactionState};
use clap::Args;

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Transaction to process; every draft transaction when omitted
    #[arg(long)]
    pub id: Option<u64>,
}

impl ProcessArgs {
    /// Execute the process command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (_, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let Some(id) = self.id else {
            tracing::info!("Processing draft transactions");
            let result = match auto_process_edi_transactions(&ctx).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(error = %e, "Auto processing failed");
                    println!("❌ Processing failed: {e}");
                    return Ok(exit_code(&e));
                }
            };

            println!("📊 Processing Summary:");
            println!("  Processed: {}", result.successful);
            println!("  Failed: {}", result.failed);
            println!("  Skipped: {}", result.skipped);
            println!();
            print_errors(&result.errors);
            return Ok(if result.is_successful() { 0 } else { 1 });
        };

        let processor = Processor::new(&ctx);
        let outcome = match processor.load(TransactionId::new(id)) {
            Ok(mut tx) => processor.process(&mut tx).await.map(|()| tx),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(tx) => {
                println!("Transaction {} ({}): {}", tx.id, tx.name, tx.state);
                for note in &tx.notes {
                    println!("  {note}");
                }
                Ok(match tx.state {
                    TransactionState::Done => 0,
                    _ => 1,
                })
            }
            Err(e) => {
                tracing::error!(transaction_id = id, error = %e, "Processing failed");
                println!("❌ Processing failed: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

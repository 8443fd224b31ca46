//! Operator actions on single transactions: recompute, reset and cancel

use super::{exit_code, open_context};
use crate::core::process::Processor;
use crate::domain::{Transaction, TransactionId};
use clap::Args;

/// Arguments for the recompute command
#[derive(Args, Debug)]
pub struct RecomputeArgs {
    /// Failed outgoing transaction whose XML is regenerated
    #[arg(long)]
    pub id: u64,
}

impl RecomputeArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (_, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        let processor = Processor::new(&ctx);
        let result = processor
            .load(TransactionId::new(self.id))
            .and_then(|tx| processor.recompute_xml(tx));
        Ok(report("Recompute", result))
    }
}

/// Arguments for the reset command
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Transaction moved back to draft
    #[arg(long)]
    pub id: u64,
}

impl ResetArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (_, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        Ok(report(
            "Reset",
            Processor::new(&ctx).reset(TransactionId::new(self.id)),
        ))
    }
}

/// Arguments for the cancel command
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Transaction to cancel
    #[arg(long)]
    pub id: u64,
}

impl CancelArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (_, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        Ok(report(
            "Cancel",
            Processor::new(&ctx).cancel(TransactionId::new(self.id)),
        ))
    }
}

fn report(action: &str, result: crate::domain::Result<Transaction>) -> i32 {
    match result {
        Ok(tx) => {
            println!("✅ {action}: transaction {} ({}) is now {}", tx.id, tx.name, tx.state);
            0
        }
        Err(e) => {
            tracing::error!(action, error = %e, "Operator action failed");
            println!("❌ {action} failed: {e}");
            exit_code(&e)
        }
    }
}

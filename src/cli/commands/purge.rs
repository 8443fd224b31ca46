//! Purge-logs command implementation

use super::{exit_code, open_context};
use crate::core::state::purge_expired_logs;
use chrono::Utc;
use clap::Args;

/// Arguments for the purge-logs command
#[derive(Args, Debug)]
pub struct PurgeLogsArgs {
    /// Retention in days (defaults to processing.log_retention_days)
    #[arg(long)]
    pub days: Option<i64>,
}

impl PurgeLogsArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (config, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        let days = self.days.unwrap_or(config.processing.log_retention_days);
        if days <= 0 {
            println!("❌ Retention must be at least one day");
            return Ok(2);
        }

        match purge_expired_logs(ctx.edi.as_ref(), days, Utc::now()) {
            Ok(removed) => {
                println!("🧹 Removed {removed} log book(s) older than {days} day(s)");
                Ok(0)
            }
            Err(e) => {
                println!("❌ Purge failed: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

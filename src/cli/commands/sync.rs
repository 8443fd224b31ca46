//! Directory and file sync commands

use super::{exit_code, open_context};
use crate::core::sync::{sync_directories, sync_inner_files};
use crate::domain::{DirectoryId, ServerId};
use clap::Args;
use std::str::FromStr;

/// Arguments for the sync-directories command
#[derive(Args, Debug)]
pub struct SyncDirectoriesArgs {
    /// Server id from the configuration
    #[arg(long)]
    pub server: String,
}

impl SyncDirectoriesArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (_, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        let server = ServerId::from_str(&self.server).map_err(anyhow::Error::msg)?;

        match sync_directories(&ctx, &server).await {
            Ok(report) => {
                println!("📂 Directory sync for {server}");
                for path in &report.created {
                    println!("  + {path}");
                }
                for path in &report.removed {
                    println!("  - {path}");
                }
                println!(
                    "✅ {} created, {} removed",
                    report.created.len(),
                    report.removed.len()
                );
                Ok(0)
            }
            Err(e) => {
                tracing::error!(server = %server, error = %e, "Directory sync failed");
                println!("❌ Directory sync failed: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

/// Arguments for the sync-files command
#[derive(Args, Debug)]
pub struct SyncFilesArgs {
    /// Server id from the configuration
    #[arg(long)]
    pub server: String,

    /// Sync only this directory id
    #[arg(long)]
    pub directory: Option<u64>,
}

impl SyncFilesArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (_, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        let server = ServerId::from_str(&self.server).map_err(anyhow::Error::msg)?;

        match sync_inner_files(&ctx, &server, self.directory.map(DirectoryId::new)).await {
            Ok(report) => {
                println!("📥 File sync for {server}");
                println!("  Attachments created: {}", report.attachments_created);
                println!("  Transactions created: {}", report.transactions_created);
                println!("  Files split: {}", report.files_split);
                if !report.unmatched.is_empty() {
                    println!("  ⚠️  No incoming schema for:");
                    for name in &report.unmatched {
                        println!("    - {name}");
                    }
                    return Ok(1);
                }
                Ok(0)
            }
            Err(e) => {
                tracing::error!(server = %server, error = %e, "File sync failed");
                println!("❌ File sync failed: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

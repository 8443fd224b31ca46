//! Status command implementation
//!
//! This module implements the `status` command for displaying transaction states and
//! known remote directories.

use super::open_context;
use crate::domain::{Direction, TransactionState};
use clap::Args;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only list transactions in this state (draft, done, failed, partially_done, cancel)
    #[arg(long)]
    pub state: Option<String>,

    /// Maximum transactions listed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking transaction status");

        let filter = match self.state.as_deref().map(TransactionState::from_str).transpose() {
            Ok(f) => f,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let (config, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        println!("📊 Transaction Status");
        println!();

        let transactions = match ctx.edi.transactions() {
            Ok(t) => t,
            Err(e) => {
                println!("❌ Failed to load transactions");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if transactions.is_empty() {
            println!("No transactions found.");
            println!("Run 'ediflow export' or 'ediflow sync-files' to create some.");
        } else {
            let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
            for tx in &transactions {
                let direction = match tx.direction {
                    Direction::Incoming => "incoming",
                    Direction::Outgoing => "outgoing",
                };
                *counts
                    .entry((direction.to_string(), tx.state.to_string()))
                    .or_default() += 1;
            }
            println!("{:<12} {:<16} {:<10}", "Direction", "State", "Count");
            println!("{}", "-".repeat(40));
            for ((direction, state), count) in &counts {
                println!("{direction:<12} {state:<16} {count:<10}");
            }
            println!();

            let listed: Vec<_> = transactions
                .iter()
                .filter(|tx| filter.map_or(tx.state == TransactionState::Failed, |s| tx.state == s))
                .take(self.limit)
                .collect();
            if !listed.is_empty() {
                println!(
                    "{:<8} {:<45} {:<16} {:<25}",
                    "ID", "Name", "State", "Updated"
                );
                println!("{}", "-".repeat(96));
                for tx in listed {
                    println!(
                        "{:<8} {:<45} {:<16} {:<25}",
                        tx.id,
                        tx.name,
                        tx.state.to_string(),
                        tx.updated_at.format("%Y-%m-%d %H:%M:%S")
                    );
                    for note in &tx.notes {
                        println!("         {note}");
                    }
                }
                println!();
            }
        }

        for server in &config.servers {
            let directories = ctx.edi.directories(&server.id)?;
            println!(
                "Server {} ({}, {}): {} known director(ies)",
                server.id,
                server.protocol,
                server.address(),
                directories.len()
            );
            for dir in directories {
                let mut flags = Vec::new();
                if dir.settings.download {
                    flags.push("download");
                }
                if dir.settings.upload {
                    flags.push("upload");
                }
                if dir.settings.split_records {
                    flags.push("split");
                }
                println!("  [{}] {} {}", dir.id, dir.path, flags.join(","));
            }
        }

        Ok(0)
    }
}

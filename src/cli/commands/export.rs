//! Export command implementation
//!
//! Runs the periodic outgoing export, or exports selected records of one schema into a
//! single file.

use super::{exit_code, open_context, print_errors};
use crate::core::export::{export_edi_transactions, selection_conditions, ExportEngine};
use crate::domain::{RecordId, SchemaId};
use clap::Args;
use std::str::FromStr;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Dry run mode - count the records that would be exported
    #[arg(long)]
    pub dry_run: bool,

    /// Export only these record ids (comma-separated); requires --schema
    #[arg(long, requires = "schema")]
    pub ids: Option<String>,

    /// Schema of the selected records
    #[arg(long)]
    pub schema: Option<String>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let (config, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        if let Some(ids) = &self.ids {
            let Some(schema) = &self.schema else {
                println!("❌ --ids requires --schema");
                return Ok(2);
            };
            let ids = match parse_ids(ids) {
                Ok(ids) => ids,
                Err(e) => {
                    println!("❌ {e}");
                    return Ok(2);
                }
            };
            let schema = SchemaId::from_str(schema).map_err(anyhow::Error::msg)?;
            return match ExportEngine::new(&ctx).export_selected(&schema, &ids) {
                Ok(tx) => {
                    println!("✅ Exported {} record(s) into {} ({})", ids.len(), tx.name, tx.state);
                    Ok(0)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Selective export failed");
                    println!("❌ Export failed: {e}");
                    Ok(exit_code(&e))
                }
            };
        }

        if self.dry_run || config.application.dry_run {
            println!("🔍 DRY RUN MODE - No transactions will be created");
            println!();
            for schema in ctx.registry.outgoing_main_schemas() {
                let conditions = selection_conditions(ctx.records.as_ref(), schema)?;
                let selected = ctx.records.search(&schema.model, &conditions, None)?;
                println!("  {:<30} {:<25} {} record(s)", schema.id, schema.model, selected.len());
            }
            return Ok(0);
        }

        println!("🚀 Starting export...");
        println!();

        let summary = match export_edi_transactions(&ctx) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                println!("❌ Export failed: {e}");
                return Ok(exit_code(&e));
            }
        };

        println!("📊 Export Summary:");
        println!("  Schemas: {}", summary.schemas);
        println!("  Records Selected: {}", summary.records_selected);
        println!("  Transactions Created: {}", summary.transactions_created);
        println!("  Transactions Failed: {}", summary.transactions_failed);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();
        print_errors(&summary.errors);

        let code = if summary.is_successful() {
            println!("✅ Export completed successfully!");
            0
        } else {
            println!("⚠️  Export completed with failures");
            1
        };
        Ok(code)
    }
}

fn parse_ids(raw: &str) -> Result<Vec<RecordId>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map(RecordId::new)
                .map_err(|_| format!("Invalid record id '{s}'"))
        })
        .collect()
}

//! Validate config command implementation
//!
//! This module implements the `validate-config` command: the configuration file is
//! loaded and validated, then the schema registry is built against the record store so
//! unknown models, fields and sub-schema cycles are reported too.

use crate::adapters::store::create_record_store;
use crate::config::load_config;
use crate::core::registry::SchemaRegistry;
use crate::domain::Direction;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates every section
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let records = match create_record_store(&config.store) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to open record store");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if let Err(e) = SchemaRegistry::build(&config, records.as_ref()) {
            println!("❌ Mapping schemas are invalid");
            println!("   Error: {e}");
            return Ok(2);
        }
        println!("✅ Configuration is valid");
        println!();

        let incoming = config
            .schemas
            .iter()
            .filter(|s| s.direction == Direction::Incoming)
            .count();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!(
            "  Records Snapshot: {}",
            config.store.records_path.as_deref().unwrap_or("(memory)")
        );
        println!(
            "  State Snapshot: {}",
            config.store.state_path.as_deref().unwrap_or("(memory)")
        );
        println!(
            "  Schemas: {} ({} incoming, {} outgoing)",
            config.schemas.len(),
            incoming,
            config.schemas.len() - incoming
        );
        println!("  Translations: {}", config.translations.len());
        for server in &config.servers {
            println!(
                "  Server: {} ({} {}), {} configured director(ies)",
                server.id,
                server.protocol,
                server.address(),
                server.directories.len()
            );
        }
        println!(
            "  Receipt Endpoint: {}{} ({} route(s), {} user(s))",
            config.http.bind_address,
            config.http.route,
            config.routes.len(),
            config.users.len()
        );
        println!(
            "  Split Records Per File: {}",
            config.processing.split_records_per_file
        );
        println!(
            "  Log Retention: {} day(s)",
            config.processing.log_retention_days
        );
        println!();
        Ok(0)
    }
}

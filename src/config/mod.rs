//! Configuration management for Ediflow.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Ediflow uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `EDIFLOW_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section before use
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ediflow::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ediflow.toml")?;
//!
//! println!("Schemas: {}", config.schemas.len());
//! println!("Split size: {}", config.processing.split_records_per_file);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run mode
//! - [`StoreConfig`] - Snapshot files of the record and EDI stores
//! - [`ProcessingConfig`] - Split size, log retention, claim lease, schema depth
//! - [`LoggingConfig`] - Local file logging
//! - [`HttpConfig`] - Receipt endpoint address and route
//! - [`ServerConfig`] - Transfer servers with per-directory settings
//! - [`SchemaConfig`] - Mapping schemas and their lines
//!
//! # Example Configuration
//!
//! ```toml
//! [[servers]]
//! id = "partner-sftp"
//! protocol = "sftp"
//! host = "sftp.partner.example"
//! username = "edi"
//! password = "${EDIFLOW_PARTNER_PASSWORD}"
//!
//! [[schemas]]
//! id = "partner_export"
//! model = "res.partner"
//! direction = "outgoing"
//! xml_header = "Partners/Partner"
//!
//! [[schemas.lines]]
//! xml_element = "Name"
//! field = "name"
//! required = true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, DirectoryConfig, EdiConfig, HttpConfig, LoggingConfig, ProcessingConfig,
    Protocol, RouteConfig, SchemaConfig, SchemaLineConfig, ServerConfig, StoreConfig, UserConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};

// Ediflow - XML EDI Exchange Engine
// Copyright (c) 2025 Ediflow Contributors
// Licensed under the MIT License

//! # Ediflow - XML EDI Exchange Engine
//!
//! Ediflow moves structured business documents (orders, catalogs, inventory) between
//! business records and partner file servers as XML, driven by operator-configured
//! mapping schemas.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Exporting** unprocessed records to XML documents and uploading them
//! - **Importing** downloaded or posted XML documents into records with upsert matching
//! - **Tracking** every transfer as a transaction with a state machine and log books
//! - **Splitting** oversized documents into parts before ingestion
//! - **Receiving** cXML documents over HTTP from authenticated partners
//!
//! ## Architecture
//!
//! Ediflow follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (registry, codec, export, import, state, sync)
//! - [`adapters`] - External integrations (stores, file transports, HTTP receipt)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ediflow::adapters::store::{create_edi_store, create_record_store};
//! use ediflow::adapters::transport::DefaultTransportFactory;
//! use ediflow::config::load_config;
//! use ediflow::core::context::EngineContext;
//! use ediflow::core::process::auto_process_edi_transactions;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("ediflow.toml")?;
//!     let ctx = EngineContext::from_config(
//!         &config,
//!         create_record_store(&config.store)?,
//!         create_edi_store(&config.store)?,
//!         Arc::new(DefaultTransportFactory::new()),
//!     )?;
//!
//!     let result = auto_process_edi_transactions(&ctx).await?;
//!     println!("Processed: {}, Failed: {}", result.successful, result.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Ediflow uses the [`domain::EdiError`] type for all errors:
//!
//! ```rust,no_run
//! use ediflow::domain::EdiError;
//!
//! fn example() -> Result<(), EdiError> {
//!     let config = ediflow::config::load_config("ediflow.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Ediflow uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting export");
//! warn!(schema = "partner_export", "No records selected");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Ediflow using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Ediflow - XML EDI exchange engine
#[derive(Parser, Debug)]
#[command(name = "ediflow")]
#[command(version, about, long_about = None)]
#[command(author = "Ediflow Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ediflow.toml", env = "EDIFLOW_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "EDIFLOW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export unprocessed records of every outgoing schema
    Export(commands::export::ExportArgs),

    /// Process draft transactions (or a single one)
    Process(commands::process::ProcessArgs),

    /// Rebuild the XML of a draft outgoing transaction
    Recompute(commands::operator::RecomputeArgs),

    /// Put a failed or cancelled transaction back to draft
    Reset(commands::operator::ResetArgs),

    /// Cancel a transaction
    Cancel(commands::operator::CancelArgs),

    /// Mirror a server's directory tree
    SyncDirectories(commands::sync::SyncDirectoriesArgs),

    /// Ingest files from download directories
    SyncFiles(commands::sync::SyncFilesArgs),

    /// Split a local XML file into parts
    Split(commands::split::SplitArgs),

    /// Delete log books past the retention period
    PurgeLogs(commands::purge::PurgeLogsArgs),

    /// Run the receipt endpoint
    Serve(commands::serve::ServeArgs),

    /// Show transaction states and known directories
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

//! Split command implementation
//!
//! Splits a local XML file without touching any store.

use super::exit_code;
use crate::config::{load_config, ProcessingConfig};
use crate::core::split::split_file;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// File to split
    pub file: PathBuf,

    /// Element name to split on
    #[arg(long)]
    pub tag: String,

    /// Elements per part (defaults to processing.split_records_per_file)
    #[arg(long)]
    pub records_per_file: Option<usize>,

    /// Directory receiving the parts (defaults to the file's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

impl SplitArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let records_per_file = match self.records_per_file {
            Some(n) => n,
            None => load_config(config_path)
                .map(|c| c.processing.split_records_per_file)
                .unwrap_or_else(|_| ProcessingConfig::default().split_records_per_file),
        };
        let output_dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .file
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        std::fs::create_dir_all(&output_dir)?;

        match split_file(&self.file, &self.tag, records_per_file, &output_dir) {
            Ok(parts) => {
                println!("✂️  {} split into {} part(s):", self.file.display(), parts.len());
                for part in &parts {
                    println!("  {}", part.display());
                }
                Ok(0)
            }
            Err(e) => {
                tracing::error!(file = %self.file.display(), error = %e, "Split failed");
                println!("❌ Split failed: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

//! Serve command implementation
//!
//! Runs the receipt endpoint until a shutdown signal arrives.

use super::{exit_code, open_context};
use crate::adapters::http::{serve, ConfigAuthenticator, ReceiptService};
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind address (defaults to http.bind_address)
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeArgs {
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let (config, ctx) = match open_context(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        if config.users.is_empty() {
            tracing::warn!("No [[users]] configured, every document will be rejected");
        }

        let bind = self.bind.clone().unwrap_or(config.http.bind_address);
        let service = ReceiptService::new(
            ctx,
            Arc::new(ConfigAuthenticator::new(config.users)),
            config.http.route.clone(),
        );

        println!("🚀 Receipt endpoint listening on http://{bind}{}", config.http.route);
        let shutdown = async move {
            if shutdown_signal.wait_for(|stop| *stop).await.is_err() {
                tracing::debug!("Shutdown channel closed");
            }
        };

        match serve(&bind, service, shutdown).await {
            Ok(()) => {
                println!("Receipt endpoint stopped");
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Receipt endpoint failed");
                println!("❌ Receipt endpoint failed: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

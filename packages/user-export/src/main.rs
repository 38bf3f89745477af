// Entry point for the user permission export

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use identity_client::IdentityClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_export::{run_export, ExecutionMode, ExportConfig, FailurePolicy, PagePolicy};

/// Overrides on top of the environment configuration.
#[derive(Parser)]
#[command(
    name = "user-export",
    version,
    about = "Export identity users and their organization permissions to CSV"
)]
struct Cli {
    /// Output file (default: EXPORT_OUTPUT or result.csv)
    #[arg(long)]
    output: Option<PathBuf>,
    /// pooled or unpooled
    #[arg(long)]
    mode: Option<ExecutionMode>,
    /// Worker count for pooled mode
    #[arg(long)]
    workers: Option<usize>,
    /// Users per page
    #[arg(long)]
    page_size: Option<u32>,
    /// abort or skip
    #[arg(long)]
    failure_policy: Option<FailurePolicy>,
    /// conservative or exact
    #[arg(long)]
    page_policy: Option<PagePolicy>,
}

impl Cli {
    fn apply(self, mut config: ExportConfig) -> ExportConfig {
        if let Some(output) = self.output {
            config = config.with_output(output);
        }
        if let Some(mode) = self.mode {
            config = config.with_mode(mode);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }
        if let Some(policy) = self.failure_policy {
            config = config.with_failure_policy(policy);
        }
        if let Some(policy) = self.page_policy {
            config = config.with_page_policy(policy);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,user_export=debug,identity_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = ExportConfig::from_env().context("Failed to load configuration")?;
    let config = cli.apply(config);
    tracing::info!(host = %config.host, output = %config.output.display(), "Configuration loaded");

    let client =
        IdentityClient::new(config.request_timeout).context("Failed to create identity client")?;

    let summary = run_export(&config, Arc::new(client))
        .await
        .context("Export failed")?;

    if !summary.pages_failed.is_empty() {
        tracing::warn!(pages = ?summary.pages_failed, "Some pages were skipped");
    }
    tracing::info!(
        pages = summary.pages_planned,
        entries = summary.entries_written,
        output = %summary.output.display(),
        "Export complete"
    );

    Ok(())
}

//! Concurrent export of identity users and their organization permissions.
//!
//! Probes the identity service for the total user count, fetches every page
//! on a pool of workers, flattens each user into one row per organization
//! membership and writes the rows to a CSV file once all pages are in.
//!
//! # Architecture
//!
//! ```text
//! plan_page_count (probe page 1)
//!     │
//!     ▼
//! build_jobs ─► FetchPool (pooled queue or task per page)
//!                   │
//!                   ├─► ResultSink ──────────► ResultBuffer
//!                   ├─► PageReport ──────────► orchestrator (FailurePolicy)
//!                   └─► CompletionGuard ─────► CompletionBarrier
//!                                                   │ wait()
//!                                                   ▼
//!                                      export_to_file (drain buffer)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use identity_client::IdentityClient;
//! use user_export::{run_export, ExportConfig};
//!
//! let config = ExportConfig::from_env()?;
//! let client = IdentityClient::new(config.request_timeout)?;
//! let summary = run_export(&config, Arc::new(client)).await?;
//! println!("{} rows written to {}", summary.entries_written, summary.output.display());
//! ```

pub mod barrier;
pub mod buffer;
pub mod config;
pub mod entry;
pub mod error;
pub mod export;
pub mod planner;
pub mod pool;

pub use barrier::{CompletionBarrier, CompletionGuard};
pub use buffer::{ResultBuffer, ResultSink};
pub use config::{ExecutionMode, ExportConfig, FailurePolicy};
pub use entry::{build_jobs, flatten_user, FlattenedEntry, PageJob};
pub use error::{ExportError, Result};
pub use export::{export_to_file, CsvExporter, HEADER};
pub use planner::{page_count, plan_page_count, PagePolicy};
pub use pool::{process_job, FetchPool, PageReport};

use std::path::PathBuf;
use std::sync::Arc;

use identity_client::{PageRequest, UserDirectory};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What a finished export did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages_planned: u32,
    /// Pages left out under [`FailurePolicy::Skip`], sorted
    pub pages_failed: Vec<u32>,
    pub entries_written: usize,
    pub output: PathBuf,
}

/// Run a full export: plan, fetch every page, wait, write the CSV.
///
/// Under [`FailurePolicy::Abort`] the first failed page cancels the
/// remaining work and returns [`ExportError::Fetch`] without creating the
/// output file.
pub async fn run_export<D>(config: &ExportConfig, directory: Arc<D>) -> Result<ExportSummary>
where
    D: UserDirectory + ?Sized + 'static,
{
    config.validate()?;

    let template = PageRequest::new(
        config.host.clone(),
        config.token.clone(),
        planner::PROBE_PAGE,
        config.page_size,
    );
    let pages = plan_page_count(directory.as_ref(), &template, config.page_policy).await?;
    info!(
        pages,
        page_size = config.page_size,
        mode = %config.mode,
        workers = config.workers,
        "Planned export"
    );

    let jobs = build_jobs(&template, pages);
    let buffer = ResultBuffer::new();
    let barrier = CompletionBarrier::new(jobs.len());
    let (report_tx, mut report_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let pool = FetchPool::new(
        directory,
        buffer.sink(),
        barrier.clone(),
        report_tx,
        cancel.clone(),
    );
    pool.dispatch(config.mode, config.workers, config.queue_capacity(), jobs);

    let mut tally = ReportTally::new(config.failure_policy);
    {
        let all_done = barrier.wait();
        tokio::pin!(all_done);

        loop {
            tokio::select! {
                biased;
                Some(report) = report_rx.recv() => {
                    if let Err(e) = tally.record(report) {
                        cancel.cancel();
                        return Err(e);
                    }
                }
                _ = &mut all_done => break,
            }
        }
    }

    // Reports sent just before the barrier released.
    while let Ok(report) = report_rx.try_recv() {
        if let Err(e) = tally.record(report) {
            cancel.cancel();
            return Err(e);
        }
    }
    tally.check_complete(pages)?;

    info!(output = %config.output.display(), "Writing csv file");
    let entries_written = export_to_file(&config.output, buffer.drain())?;
    if entries_written != tally.entries {
        warn!(
            expected = tally.entries,
            written = entries_written,
            "Export row count differs from fetched entries"
        );
    }
    info!(entries = entries_written, "Done");

    let mut pages_failed = tally.failed_pages;
    pages_failed.sort_unstable();

    Ok(ExportSummary {
        pages_planned: pages,
        pages_failed,
        entries_written,
        output: config.output.clone(),
    })
}

/// Applies the failure policy to page reports as they arrive.
struct ReportTally {
    policy: FailurePolicy,
    reports: usize,
    entries: usize,
    failed_pages: Vec<u32>,
}

impl ReportTally {
    fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            reports: 0,
            entries: 0,
            failed_pages: Vec::new(),
        }
    }

    fn record(&mut self, report: PageReport) -> Result<()> {
        self.reports += 1;
        match report.outcome {
            Ok(entries) => {
                self.entries += entries;
                Ok(())
            }
            Err(source) => match self.policy {
                FailurePolicy::Abort => Err(ExportError::Fetch {
                    page: report.page,
                    source,
                }),
                FailurePolicy::Skip => {
                    warn!(page = report.page, error = %source, "Skipping failed page");
                    self.failed_pages.push(report.page);
                    Ok(())
                }
            },
        }
    }

    /// Every job signals the barrier, but one that panicked never reports.
    fn check_complete(&self, pages: u32) -> Result<()> {
        let expected = pages as usize;
        if self.reports >= expected {
            return Ok(());
        }

        let missing = expected - self.reports;
        match self.policy {
            FailurePolicy::Abort => Err(ExportError::Worker(format!(
                "{} of {} page jobs ended without a result",
                missing, expected
            ))),
            FailurePolicy::Skip => {
                warn!(missing, "Page jobs ended without a result");
                Ok(())
            }
        }
    }
}

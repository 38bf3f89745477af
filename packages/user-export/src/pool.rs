//! Page fetch workers.
//!
//! In pooled mode a fixed number of workers pull [`PageJob`]s from one
//! bounded queue; in unpooled mode every page gets its own task. Either way
//! each job:
//!
//! ```text
//! PageJob
//!     │
//!     ├─► UserDirectory::list_users
//!     ├─► flatten every user ─► ResultSink
//!     ├─► PageReport ─► orchestrator
//!     └─► CompletionGuard dropped ─► CompletionBarrier
//! ```
//!
//! The report is sent before the guard drops, so by the time the barrier
//! releases every finished job has its report queued. Each pooled job runs
//! in its own task; a job that panics still drops its guard but sends no
//! report, and the worker moves on to the next page.

use std::sync::Arc;

use identity_client::{IdentityError, UserDirectory};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::barrier::CompletionBarrier;
use crate::buffer::ResultSink;
use crate::config::ExecutionMode;
use crate::entry::{flatten_user, PageJob};

/// Outcome of one page job.
#[derive(Debug)]
pub struct PageReport {
    pub page: u32,
    /// Entries pushed to the buffer, or why the page failed
    pub outcome: Result<usize, IdentityError>,
}

/// Fetch one page and push its flattened entries into `sink`.
///
/// Returns the number of entries produced.
pub async fn process_job<D>(
    directory: &D,
    job: &PageJob,
    sink: &ResultSink,
) -> Result<usize, IdentityError>
where
    D: UserDirectory + ?Sized,
{
    let listing = directory.list_users(&job.request).await?;

    let mut produced = 0;
    for user in &listing.results {
        for entry in flatten_user(user) {
            sink.push(entry);
            produced += 1;
        }
    }

    Ok(produced)
}

/// Shared state handed to every worker task.
pub struct FetchPool<D: ?Sized> {
    directory: Arc<D>,
    sink: ResultSink,
    barrier: CompletionBarrier,
    reports: mpsc::UnboundedSender<PageReport>,
    cancel: CancellationToken,
}

impl<D: ?Sized> Clone for FetchPool<D> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            sink: self.sink.clone(),
            barrier: self.barrier.clone(),
            reports: self.reports.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<D> FetchPool<D>
where
    D: UserDirectory + ?Sized + 'static,
{
    pub fn new(
        directory: Arc<D>,
        sink: ResultSink,
        barrier: CompletionBarrier,
        reports: mpsc::UnboundedSender<PageReport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            directory,
            sink,
            barrier,
            reports,
            cancel,
        }
    }

    /// Start processing `jobs` and return the spawned task handles.
    ///
    /// `workers` and `queue_capacity` only apply to pooled mode.
    pub fn dispatch(
        self,
        mode: ExecutionMode,
        workers: usize,
        queue_capacity: usize,
        jobs: Vec<PageJob>,
    ) -> Vec<JoinHandle<()>> {
        match mode {
            ExecutionMode::Pooled => self.spawn_pooled(workers, queue_capacity, jobs),
            ExecutionMode::Unpooled => self.spawn_unpooled(jobs),
        }
    }

    fn spawn_pooled(
        self,
        workers: usize,
        queue_capacity: usize,
        jobs: Vec<PageJob>,
    ) -> Vec<JoinHandle<()>> {
        let (job_tx, job_rx) = mpsc::channel::<PageJob>(queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(job_rx));

        let mut handles = Vec::with_capacity(workers + 1);
        for worker_id in 0..workers.max(1) {
            let pool = self.clone();
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                pool.worker_loop(worker_id, queue).await
            }));
        }

        let cancel = self.cancel.clone();
        handles.push(tokio::spawn(async move {
            for job in jobs {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = job_tx.send(job) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            // Dropping the sender closes the queue so idle workers exit.
        }));

        handles
    }

    fn spawn_unpooled(self, jobs: Vec<PageJob>) -> Vec<JoinHandle<()>> {
        jobs.into_iter()
            .map(|job| {
                let pool = self.clone();
                tokio::spawn(async move {
                    if pool.cancel.is_cancelled() {
                        return;
                    }
                    pool.run_job(job).await;
                })
            })
            .collect()
    }

    async fn worker_loop(self, worker_id: usize, queue: Arc<Mutex<mpsc::Receiver<PageJob>>>) {
        trace!(worker_id, "Worker started");

        loop {
            let job = {
                let mut rx = queue.lock().await;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    job = rx.recv() => job,
                }
            };

            let Some(job) = job else { break };
            let page = job.page();
            debug!(worker_id, job_id = job.id, page, "Worker picked up page");

            let pool = self.clone();
            if let Err(e) = tokio::spawn(async move { pool.run_job(job).await }).await {
                warn!(worker_id, page, error = %e, "Page job panicked");
            }
        }

        trace!(worker_id, "Worker stopped");
    }

    async fn run_job(&self, job: PageJob) {
        let _guard = self.barrier.guard();

        let outcome = process_job(self.directory.as_ref(), &job, &self.sink).await;
        match &outcome {
            Ok(entries) => debug!(page = job.page(), entries, "Page processed"),
            Err(e) => debug!(page = job.page(), error = %e, "Page failed"),
        }

        // The orchestrator may already have given up on the run.
        let _ = self.reports.send(PageReport {
            page: job.page(),
            outcome,
        });
    }
}

//! Completion barrier for outstanding page jobs.
//!
//! A counting wait-group: created with the number of jobs, decremented once
//! per finished job, and awaited by the orchestrator before the export
//! starts draining the result buffer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::warn;

struct Inner {
    remaining: AtomicUsize,
    notify: Notify,
}

/// Blocks waiters until every registered job has signalled completion.
#[derive(Clone)]
pub struct CompletionBarrier {
    inner: Arc<Inner>,
}

impl CompletionBarrier {
    pub fn new(jobs: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                remaining: AtomicUsize::new(jobs),
                notify: Notify::new(),
            }),
        }
    }

    /// Jobs that have not signalled yet.
    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Signal that one job finished.
    pub fn done(&self) {
        let previous =
            self.inner
                .remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.inner.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => warn!("completion signalled with no outstanding jobs"),
        }
    }

    /// A guard that signals completion when dropped, so a job counts as done
    /// whether it succeeds, fails or panics.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard {
            barrier: self.clone(),
        }
    }

    /// Wait until no jobs are outstanding. Returns immediately if none are.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the counter so a release between the
            // check and the await is not missed.
            notified.as_mut().enable();

            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Signals its barrier exactly once, on drop.
pub struct CompletionGuard {
    barrier: CompletionBarrier,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.barrier.done();
    }
}

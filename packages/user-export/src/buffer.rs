//! Shared result buffer.
//!
//! Workers push entries through cloned [`ResultSink`]s while the buffer
//! itself stays with the orchestrator, which drains it once the completion
//! barrier has released. The channel is unbounded so producers never stall
//! waiting on a consumer that only runs at the end.

use tokio::sync::mpsc;

use crate::entry::FlattenedEntry;

/// Unordered collection of entries fed by many producers.
pub struct ResultBuffer {
    tx: mpsc::UnboundedSender<FlattenedEntry>,
    rx: mpsc::UnboundedReceiver<FlattenedEntry>,
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultBuffer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A producer handle for one worker.
    pub fn sink(&self) -> ResultSink {
        ResultSink {
            tx: self.tx.clone(),
        }
    }

    /// Entries currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Take entries one by one until the buffer is empty.
    ///
    /// Only call this once every producer has finished; entries pushed after
    /// the drain has reached the end are not seen.
    pub fn drain(self) -> Drain {
        Drain { rx: self.rx }
    }
}

/// Producer side of a [`ResultBuffer`].
#[derive(Clone)]
pub struct ResultSink {
    tx: mpsc::UnboundedSender<FlattenedEntry>,
}

impl ResultSink {
    /// Append one entry. Returns `false` if the buffer is gone.
    pub fn push(&self, entry: FlattenedEntry) -> bool {
        self.tx.send(entry).is_ok()
    }
}

/// Draining iterator returned by [`ResultBuffer::drain`].
pub struct Drain {
    rx: mpsc::UnboundedReceiver<FlattenedEntry>,
}

impl Iterator for Drain {
    type Item = FlattenedEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(org: &str) -> FlattenedEntry {
        FlattenedEntry {
            user_email: "a@example.com".into(),
            user_id: "u-1".into(),
            org_id: org.into(),
            permissions: vec!["read".into()],
        }
    }

    #[test]
    fn test_drain_returns_everything_pushed() {
        let buffer = ResultBuffer::new();
        let sink = buffer.sink();
        assert!(buffer.is_empty());

        assert!(sink.push(entry("org-1")));
        assert!(sink.push(entry("org-2")));
        assert_eq!(buffer.len(), 2);

        let mut orgs: Vec<_> = buffer.drain().map(|e| e.org_id).collect();
        orgs.sort();
        assert_eq!(orgs, vec!["org-1", "org-2"]);
    }

    #[test]
    fn test_push_after_buffer_dropped() {
        let buffer = ResultBuffer::new();
        let sink = buffer.sink();
        drop(buffer);

        assert!(!sink.push(entry("org-1")));
    }

    #[tokio::test]
    async fn test_concurrent_producers() {
        let buffer = ResultBuffer::new();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let sink = buffer.sink();
                tokio::spawn(async move {
                    for i in 0..100 {
                        sink.push(entry(&format!("org-{}-{}", worker, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(buffer.drain().count(), 800);
    }
}

//! Bounded ingestion queue between capture sites and the batch writer.
//!
//! Submission never blocks a request path and never surfaces an error to
//! the caller. When the queue is full the record is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use reqlog_core::classify_content;
use reqlog_core::defaults::QUEUE_CAPACITY;
use reqlog_core::RequestLog;

/// Factory for the two halves of the ingestion queue.
pub struct LogQueue;

impl LogQueue {
    /// Create a queue with the default capacity.
    pub fn new() -> (Submitter, QueueReceiver) {
        Self::bounded(QUEUE_CAPACITY)
    }

    /// Create a queue holding at most `capacity` records.
    pub fn bounded(capacity: usize) -> (Submitter, QueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        let submitter = Submitter {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (submitter, QueueReceiver { rx })
    }
}

/// Producer half of the ingestion queue.
///
/// Cheap to clone; every clone shares the same queue and drop counter.
#[derive(Clone)]
pub struct Submitter {
    tx: mpsc::Sender<RequestLog>,
    dropped: Arc<AtomicU64>,
}

impl Submitter {
    /// Classify `raw_content` onto the record, then submit it without
    /// blocking.
    ///
    /// Classification always yields a storable payload: empty content
    /// stays absent, valid JSON is kept verbatim, anything else is
    /// wrapped in an error envelope. Returns `true` if the record was
    /// accepted. A full queue or a stopped writer drops the record and
    /// bumps the drop counter.
    pub fn submit(&self, mut record: RequestLog, raw_content: &[u8]) -> bool {
        record.content_json = classify_content(raw_content);

        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                let dropped_total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    subsystem = "pipeline",
                    component = "queue",
                    path = %record.path,
                    dropped_total,
                    "Log queue is full, dropping record"
                );
                false
            }
            Err(TrySendError::Closed(record)) => {
                let dropped_total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    subsystem = "pipeline",
                    component = "queue",
                    path = %record.path,
                    dropped_total,
                    "Log queue is closed, dropping record"
                );
                false
            }
        }
    }

    /// Total records dropped at submission since the queue was created.
    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half of the ingestion queue, owned by the batch writer.
pub struct QueueReceiver {
    rx: mpsc::Receiver<RequestLog>,
}

impl QueueReceiver {
    /// Receive the next record. Returns `None` once the queue is closed
    /// and every buffered record has been delivered.
    pub(crate) async fn recv(&mut self) -> Option<RequestLog> {
        self.rx.recv().await
    }

    /// Refuse further submissions. Records already buffered remain
    /// receivable until `recv` returns `None`.
    pub(crate) fn close(&mut self) {
        self.rx.close();
    }
}

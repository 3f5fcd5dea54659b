//! Batch writer draining the ingestion queue into a sink.
//!
//! A single writer task accumulates records into batches and hands each
//! non-empty batch to a [`RequestLogSink`]. A batch is flushed when it
//! reaches `batch_max` records or when `flush_interval_ms` elapses,
//! whichever comes first. The interval countdown restarts with each new
//! batch. Failed batches are logged and discarded; the writer never
//! retries and never stops over a sink error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use reqlog_core::defaults::{BATCH_MAX, FLUSH_INTERVAL_MS};
use reqlog_core::{Error, RequestLog, RequestLogSink, Result};

use crate::queue::QueueReceiver;

/// Configuration for the batch writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum number of records per flushed batch.
    pub batch_max: usize,
    /// How long a partial batch may wait before it is flushed, in
    /// milliseconds.
    pub flush_interval_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_max: BATCH_MAX,
            flush_interval_ms: FLUSH_INTERVAL_MS,
        }
    }
}

impl WriterConfig {
    /// Create configuration from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `REQLOG_BATCH_MAX` | `100` | Maximum records per batch |
    /// | `REQLOG_FLUSH_INTERVAL_MS` | `500` | Partial batch wait before flush |
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let batch_max = std::env::var("REQLOG_BATCH_MAX")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(BATCH_MAX)
            .max(1);

        let flush_interval_ms = std::env::var("REQLOG_FLUSH_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(FLUSH_INTERVAL_MS);

        Self {
            batch_max,
            flush_interval_ms,
        }
    }

    /// Set the maximum number of records per batch (minimum 1).
    pub fn with_batch_max(mut self, batch_max: usize) -> Self {
        self.batch_max = batch_max.max(1);
        self
    }

    /// Set the flush interval in milliseconds.
    pub fn with_flush_interval_ms(mut self, flush_interval_ms: u64) -> Self {
        self.flush_interval_ms = flush_interval_ms;
        self
    }
}

/// Handle for controlling a running batch writer.
///
/// Dropping the handle closes the shutdown channel, which also stops
/// the writer gracefully, but only [`shutdown`](Self::shutdown) waits
/// for the drain to finish.
pub struct WriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl WriterHandle {
    /// Stop the writer after flushing every record still queued.
    ///
    /// Submissions racing with shutdown are dropped and counted by the
    /// [`Submitter`](crate::queue::Submitter), never blocked.
    pub async fn shutdown(self) -> Result<()> {
        // The writer may already have stopped on its own.
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Batch writer task failed: {e}")))
    }
}

/// Batch writer that drains a [`QueueReceiver`] into a sink.
pub struct BatchWriter {
    sink: Arc<dyn RequestLogSink>,
    config: WriterConfig,
}

impl BatchWriter {
    /// Create a writer for the given sink.
    pub fn new(sink: Arc<dyn RequestLogSink>, config: WriterConfig) -> Self {
        Self { sink, config }
    }

    /// Start the writer task and return a handle for shutdown.
    pub fn start(self, receiver: QueueReceiver) -> WriterHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            self.run(receiver, shutdown_rx).await;
        });

        WriterHandle { shutdown_tx, task }
    }

    async fn run(&self, mut receiver: QueueReceiver, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            subsystem = "pipeline",
            component = "writer",
            batch_max = self.config.batch_max,
            flush_interval_ms = self.config.flush_interval_ms,
            "Batch writer started"
        );

        let flush_interval = Duration::from_millis(self.config.flush_interval_ms);

        loop {
            let mut batch: Vec<RequestLog> = Vec::with_capacity(self.config.batch_max);
            let deadline = sleep(flush_interval);
            tokio::pin!(deadline);
            let mut stopping = false;

            // Accumulate until the batch is full, the interval elapses,
            // or a stop condition interrupts the cycle.
            while batch.len() < self.config.batch_max {
                tokio::select! {
                    maybe = receiver.recv() => match maybe {
                        Some(record) => batch.push(record),
                        // Every submitter is gone; nothing more will arrive.
                        None => {
                            stopping = true;
                            break;
                        }
                    },
                    _ = &mut deadline => break,
                    // Explicit signal or a dropped handle both stop the
                    // writer after a final drain.
                    _ = shutdown_rx.recv() => {
                        stopping = true;
                        break;
                    }
                }
            }

            self.flush(&mut batch).await;

            if stopping {
                self.drain(&mut receiver).await;
                break;
            }
        }

        info!(
            subsystem = "pipeline",
            component = "writer",
            "Batch writer stopped"
        );
    }

    /// Flush every record still buffered in the queue, in batch-sized
    /// chunks, refusing new submissions from this point on.
    async fn drain(&self, receiver: &mut QueueReceiver) {
        receiver.close();

        let mut batch = Vec::with_capacity(self.config.batch_max);
        while let Some(record) = receiver.recv().await {
            batch.push(record);
            if batch.len() >= self.config.batch_max {
                self.flush(&mut batch).await;
            }
        }
        self.flush(&mut batch).await;
    }

    /// Hand one batch to the sink and clear it. A failed batch is
    /// logged with its size and discarded.
    async fn flush(&self, batch: &mut Vec<RequestLog>) {
        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        let start = std::time::Instant::now();

        match self.sink.write_batch(batch).await {
            Ok(()) => {
                debug!(
                    subsystem = "pipeline",
                    component = "writer",
                    op = "flush",
                    count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Batch flushed"
                );
            }
            Err(e) => {
                error!(
                    subsystem = "pipeline",
                    component = "writer",
                    op = "flush",
                    count,
                    error = %e,
                    "Batch write failed, discarding batch"
                );
            }
        }

        batch.clear();
    }
}

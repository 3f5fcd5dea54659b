//! # reqlog-pipeline
//!
//! Asynchronous ingestion pipeline for reqlog.
//!
//! This crate provides:
//! - A bounded queue between capture sites and persistence
//! - Non-blocking, loss-tolerant record submission
//! - A batch writer with dual flush triggers (size cap or interval)
//! - Graceful drain on shutdown
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reqlog_pipeline::{BatchWriter, LogQueue, WriterConfig};
//!
//! let (submitter, receiver) = LogQueue::new();
//! let sink = Arc::new(reqlog_db::PgRequestLogStore::new(pool));
//!
//! // Start the writer task
//! let handle = BatchWriter::new(sink, WriterConfig::from_env()).start(receiver);
//!
//! // Capture sites clone the submitter and enqueue records; the raw
//! // request content is classified on the way in
//! submitter.submit(record, &raw_content);
//!
//! // Graceful shutdown: flush everything still queued, then stop
//! handle.shutdown().await?;
//! ```

pub mod queue;
pub mod writer;

// Re-export core types
pub use reqlog_core::*;

// Re-export pipeline types
pub use queue::{LogQueue, QueueReceiver, Submitter};
pub use writer::{BatchWriter, WriterConfig, WriterHandle};

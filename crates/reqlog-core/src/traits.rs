//! Core traits for reqlog abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::RequestLog;

/// Destination for flushed batches of request logs.
///
/// A batch is an all-or-nothing unit: implementations must either persist
/// every record in the slice or report failure for the whole call. The
/// writer loop discards a failed batch and moves on, so implementations
/// should not retry internally.
#[async_trait]
pub trait RequestLogSink: Send + Sync {
    /// Persist one batch of records. Never invoked with an empty slice.
    async fn write_batch(&self, records: &[RequestLog]) -> Result<()>;
}

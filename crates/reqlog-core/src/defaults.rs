//! Centralized default constants for the reqlog system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// INGESTION QUEUE
// =============================================================================

/// Default ingestion queue capacity in records.
///
/// Records submitted while the queue is full are dropped, so this bounds
/// the memory held by captured-but-unwritten records during sink outages.
pub const QUEUE_CAPACITY: usize = 10_000;

// =============================================================================
// BATCH WRITER
// =============================================================================

/// Maximum records per flushed batch.
pub const BATCH_MAX: usize = 100;

/// Maximum milliseconds a partial batch may wait before it is flushed.
pub const FLUSH_INTERVAL_MS: u64 = 500;

// =============================================================================
// CONTENT CAPTURE
// =============================================================================

/// Maximum uploaded file size eligible for content capture (100 MiB).
///
/// Larger uploads are recorded with a sentinel message in place of their
/// content; the request itself is not rejected.
pub const FILE_SIZE_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

/// Maximum bytes of a non-JSON body echoed into the error envelope.
pub const INVALID_CONTENT_PREFIX_BYTES: usize = 10_000;

/// Default multipart field name holding the uploaded file.
pub const FILE_FIELD_NAME: &str = "file";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

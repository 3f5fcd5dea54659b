//! # reqlog-core
//!
//! Core types, traits, and abstractions for the reqlog request capture
//! pipeline.
//!
//! This crate provides the foundational data model and trait definitions
//! that the other reqlog crates depend on: the immutable [`RequestLog`]
//! record, the [`RequestLogSink`] seam that persistence backends
//! implement, and the body content classifier.

pub mod classify;
pub mod defaults;
pub mod error;
pub mod record;
pub mod traits;

// Re-export commonly used types at crate root
pub use classify::classify_content;
pub use error::{Error, Result};
pub use record::RequestLog;
pub use traits::RequestLogSink;

//! # reqlog-axum
//!
//! Axum middleware that records one [`RequestLog`] per handled request.
//!
//! This crate provides:
//! - Passive request/response observation with path exemptions
//! - Bounded content capture for JSON bodies and multipart uploads
//! - Body restoration so downstream extractors are unaffected
//! - Fire-and-forget submission into the reqlog pipeline
//!
//! ## Example
//!
//! ```ignore
//! use axum::{middleware::from_fn_with_state, routing::post, Router};
//! use reqlog_axum::{capture_middleware, CaptureState, PathFilter};
//! use reqlog_pipeline::LogQueue;
//!
//! let (submitter, receiver) = LogQueue::new();
//! let state = CaptureState::new(submitter)
//!     .with_service_name("orders")
//!     .with_filter(PathFilter::new(["/health", "/internal/*"]));
//!
//! let app: Router = Router::new()
//!     .route("/api/v1/orders", post(create_order))
//!     .layer(from_fn_with_state(state, capture_middleware));
//! ```

mod capture;
pub mod filter;
pub mod middleware;

// Re-export core types
pub use reqlog_core::*;

// Re-export middleware types
pub use filter::PathFilter;
pub use middleware::{capture_middleware, CaptureState, CapturedRequestId, X_REQUEST_ID};
